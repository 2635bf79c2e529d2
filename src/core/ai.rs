use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::{AssistantConfig, ConfigError};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Seam to the language model provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ApiError>;
}

/// OpenAI-compatible chat completions over HTTP.
pub struct HttpCompletionClient {
    client: Client,
    url: Url,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    pub fn new(config: &AssistantConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("assistant http client: {}", e)))?;
        Ok(Self {
            client,
            url: config.completions_url()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": 0,
                "response_format": { "type": "json_object" },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "assistant provider rejected request");
            return Err(ApiError::Upstream(format!("provider responded with {}", status)));
        }

        let body = response.json::<Value>().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Upstream("provider response has no message content".into()))
    }
}

/// Forms the doctor portal can fill by dictation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FormKind {
    Patient,
    Encounter,
    Prescription,
}

impl FormKind {
    /// Keys the model may return, with the instruction for each.
    pub fn fields(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            FormKind::Patient => &[
                ("full_name", "patient's full name"),
                ("date_of_birth", "birth date as YYYY-MM-DD"),
                ("sex", "one of FEMALE, MALE, OTHER"),
                ("phone", "phone number exactly as dictated"),
                ("email", "email address"),
                ("allergies", "known allergies, comma separated"),
                ("notes", "any other relevant history"),
            ],
            FormKind::Encounter => &[
                ("reason", "reason for the visit"),
                ("subjective", "symptoms and history reported by the patient"),
                ("objective", "exam findings and measurements"),
                ("assessment", "diagnosis or clinical impression"),
                ("plan", "treatment plan and follow-up"),
            ],
            FormKind::Prescription => &[
                ("diagnosis", "diagnosis the prescription treats"),
                ("notes", "instructions for the patient"),
                (
                    "items",
                    "array of objects with medication, dose, route, frequency, duration",
                ),
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Patient => "patient",
            FormKind::Encounter => "encounter",
            FormKind::Prescription => "prescription",
        }
    }

    pub fn allows(&self, key: &str) -> bool {
        self.fields().iter().any(|(name, _)| *name == key)
    }
}

/// System prompt with the strict extraction rules for one form.
pub fn system_prompt(form: FormKind) -> String {
    let fields = form
        .fields()
        .iter()
        .map(|(name, hint)| format!("- \"{}\": {}", name, hint))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You fill a medical {form} form from a doctor's dictation.\n\
         Rules:\n\
         1. Reply with exactly one JSON object and nothing else.\n\
         2. Use only these keys:\n{fields}\n\
         3. Include a key only when the dictation states its value explicitly. Never guess or invent values.\n\
         4. Keep the dictation's language and wording; do not translate or summarize clinical terms.\n\
         5. Write dates as YYYY-MM-DD.\n\
         6. Later dictation in the conversation corrects earlier dictation for the same key.",
        form = form.as_str(),
        fields = fields,
    )
}

/// System prompt, then the most recent `max_history` remembered messages,
/// then the new dictation.
pub fn build_messages(
    form: FormKind,
    history: &[ChatMessage],
    transcript: &str,
    max_history: usize,
) -> Vec<ChatMessage> {
    let skip = history.len().saturating_sub(max_history);
    let mut messages = Vec::with_capacity(history.len() - skip + 2);
    messages.push(ChatMessage::new(ChatRole::System, system_prompt(form)));
    messages.extend(history.iter().skip(skip).cloned());
    messages.push(ChatMessage::new(ChatRole::User, transcript.trim()));
    messages
}

/// Pull the JSON object out of a model reply and keep only the form's keys.
///
/// Code fences and prose around the object are tolerated; null and empty
/// values are dropped.
pub fn extract_fields(reply: &str, form: FormKind) -> Result<Map<String, Value>, ApiError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let object = match (start, end) {
        (Some(s), Some(e)) if e > s => &reply[s..=e],
        _ => return Err(ApiError::Upstream("assistant reply contains no JSON object".into())),
    };

    let parsed: Value = serde_json::from_str(object)
        .map_err(|e| ApiError::Upstream(format!("assistant reply is not valid JSON: {}", e)))?;
    let Value::Object(map) = parsed else {
        return Err(ApiError::Upstream("assistant reply is not a JSON object".into()));
    };

    let mut fields = Map::new();
    for (key, value) in map {
        if !form.allows(&key) {
            debug!(key = %key, "dropping key outside the form");
            continue;
        }
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        };
        if !empty {
            fields.insert(key, value);
        }
    }
    Ok(fields)
}
