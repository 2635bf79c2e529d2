use sqlx::types::Json;
use tracing::{debug, instrument};

use crate::core::ai::{ChatMessage, FormKind};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::Timestamp;

/// Conversation kept for one dictation session of one doctor.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoiceMemory {
    pub form: FormKind,
    pub messages: Json<Vec<ChatMessage>>,
}

impl Database {
    pub async fn load_voice_memory(
        &self,
        session_key: &str,
        doctor_id: &str,
    ) -> Result<Option<VoiceMemory>, ApiError> {
        let memory = sqlx::query_as::<_, VoiceMemory>(
            "SELECT form, messages FROM voice_memory WHERE session_key = ? AND doctor_id = ?",
        )
        .bind(session_key)
        .bind(doctor_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(memory)
    }

    /// Replace the stored conversation, keeping only the newest `keep` messages.
    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    pub async fn save_voice_memory(
        &self,
        session_key: &str,
        doctor_id: &str,
        form: FormKind,
        mut messages: Vec<ChatMessage>,
        keep: usize,
    ) -> Result<(), ApiError> {
        let excess = messages.len().saturating_sub(keep);
        messages.drain(..excess);

        sqlx::query(
            "INSERT INTO voice_memory (session_key, doctor_id, form, messages, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (session_key, doctor_id)
             DO UPDATE SET form = excluded.form, messages = excluded.messages,
                           updated_at = excluded.updated_at",
        )
        .bind(session_key)
        .bind(doctor_id)
        .bind(form)
        .bind(Json(&messages))
        .bind(Timestamp::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Returns whether anything was stored for the session.
    #[instrument(skip(self))]
    pub async fn clear_voice_memory(
        &self,
        session_key: &str,
        doctor_id: &str,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM voice_memory WHERE session_key = ? AND doctor_id = ?")
            .bind(session_key)
            .bind(doctor_id)
            .execute(self.pool())
            .await?;
        let cleared = result.rows_affected() > 0;
        debug!(cleared, "voice memory cleared");
        Ok(cleared)
    }
}
