use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};
use validator::Validate;

use crate::api::middleware::AuthUser;
use crate::core::ai::{build_messages, extract_fields, ChatMessage, ChatRole, FormKind};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const MAX_TRANSCRIPT_CHARS: usize = 20_000;

#[derive(Debug, Deserialize, Validate)]
pub struct ExtractRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_key: String,
    pub form: FormKind,
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub session_key: String,
    pub form: FormKind,
    pub fields: Map<String, Value>,
}

/// Turn one piece of dictation into form fields.
///
/// Each session remembers the conversation, so later dictation can correct
/// earlier values. Switching forms starts the memory over.
#[instrument(skip(state, caller, body), fields(form = body.form.as_str()))]
pub async fn extract(
    state: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ExtractRequest>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.practice()?;
    let body = body.into_inner();
    body.validate()?;
    let transcript = body.transcript.trim();
    if transcript.is_empty() {
        return Err(ApiError::invalid("transcript", "must not be empty"));
    }
    if transcript.chars().count() > MAX_TRANSCRIPT_CHARS {
        return Err(ApiError::invalid("transcript", "is too long"));
    }

    let max_history = state.config.assistant.max_history;
    let mut history = match state.db.load_voice_memory(&body.session_key, doctor_id).await? {
        Some(memory) if memory.form == body.form => memory.messages.0,
        _ => Vec::new(),
    };

    let messages = build_messages(body.form, &history, transcript, max_history);
    let reply = state.assistant.complete(&messages).await?;
    let fields = extract_fields(&reply, body.form)?;

    history.push(ChatMessage::new(ChatRole::User, transcript));
    history.push(ChatMessage::new(ChatRole::Assistant, json!(fields).to_string()));
    state
        .db
        .save_voice_memory(&body.session_key, doctor_id, body.form, history, max_history)
        .await?;

    info!(fields = fields.len(), "dictation extracted");
    Ok(HttpResponse::Ok().json(ExtractResponse {
        session_key: body.session_key,
        form: body.form,
        fields,
    }))
}

pub async fn clear_memory(
    state: web::Data<AppState>,
    caller: AuthUser,
    session_key: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.practice()?;
    let cleared = state.db.clear_voice_memory(&session_key, doctor_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "cleared": cleared })))
}
