//! Append-only audit trail of record mutations.
//!
//! Entries keep a SHA-256 digest of the payload rather than the payload
//! itself, so clinical content never leaves its own table.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Executor, Sqlite};
use tracing::debug;

use crate::db::Database;
use crate::error::ApiError;
use crate::models::Timestamp;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: String,
    pub actor_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub digest: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Create,
    Update,
    Delete,
    Sign,
    Cancel,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
            Action::Sign => "SIGN",
            Action::Cancel => "CANCEL",
        }
    }
}

pub fn digest<T: Serialize + ?Sized>(payload: &T) -> Result<String, ApiError> {
    let bytes = serde_json::to_vec(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub async fn record<'e, E, T>(
    executor: E,
    actor_id: &str,
    action: Action,
    entity_type: &'static str,
    entity_id: &str,
    payload: &T,
) -> Result<(), ApiError>
where
    E: Executor<'e, Database = Sqlite>,
    T: Serialize + ?Sized,
{
    let digest = digest(payload)?;
    sqlx::query(
        "INSERT INTO audit_log (id, actor_id, action, entity_type, entity_id, digest, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(actor_id)
    .bind(action.as_str())
    .bind(entity_type)
    .bind(entity_id)
    .bind(&digest)
    .bind(Timestamp::now())
    .execute(executor)
    .await?;
    debug!(action = action.as_str(), entity_type, entity_id, "audit entry written");
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub limit: Option<u32>,
}

const MAX_AUDIT_ROWS: u32 = 200;

impl Database {
    pub async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, ApiError> {
        let limit = i64::from(query.limit.unwrap_or(50).clamp(1, MAX_AUDIT_ROWS));
        let rows = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM audit_log
             WHERE (?1 IS NULL OR entity_type = ?1)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )
        .bind(query.entity_type.as_deref())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_is_stable_hex() {
        let a = digest(&json!({"name": "Ana"})).unwrap();
        let b = digest(&json!({"name": "Ana"})).unwrap();
        let c = digest(&json!({"name": "Ann"})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
