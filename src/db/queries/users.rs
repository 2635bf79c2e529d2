use tracing::{info, instrument};

use super::new_id;
use crate::audit::{self, Action};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::user::{normalize_email, Role, User};
use crate::models::Timestamp;

/// A user row ready to insert; the password is already hashed.
#[derive(Debug)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub doctor_id: Option<String>,
}

impl Database {
    #[instrument(skip(self))]
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn find_user(&self, id: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, email")
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    #[instrument(skip(self, record), fields(email = %record.email, role = record.role.as_str()))]
    pub async fn create_user(&self, record: UserRecord, actor_id: &str) -> Result<User, ApiError> {
        let now = Timestamp::now();
        let user = User {
            id: new_id(),
            email: normalize_email(&record.email),
            password_hash: record.password_hash,
            name: record.name.trim().to_string(),
            role: record.role,
            doctor_id: record.doctor_id,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, doctor_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(&user.doctor_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("email is already registered".into()),
            other => other,
        })?;
        audit::record(&mut *tx, actor_id, Action::Create, "user", &user.id, &user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Create the administrator, or reset an existing account's password
    /// and promote it. Returns `true` when a new row was inserted.
    #[instrument(skip(self, password_hash))]
    pub async fn upsert_admin(
        &self,
        email: &str,
        name: &str,
        password_hash: String,
    ) -> Result<(User, bool), ApiError> {
        if let Some(existing) = self.find_user_by_email(email).await? {
            let now = Timestamp::now();
            sqlx::query(
                "UPDATE users SET password_hash = ?, role = ?, doctor_id = NULL, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&password_hash)
            .bind(Role::Admin)
            .bind(now)
            .bind(&existing.id)
            .execute(self.pool())
            .await?;
            audit::record(self.pool(), "cli", Action::Update, "user", &existing.id, &existing.email)
                .await?;
            let user = self
                .find_user(&existing.id)
                .await?
                .ok_or(ApiError::NotFound("user"))?;
            info!(user_id = %user.id, "administrator password reset");
            return Ok((user, false));
        }

        let record = UserRecord {
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
            role: Role::Admin,
            doctor_id: None,
        };
        let user = self.create_user(record, "cli").await?;
        Ok((user, true))
    }

    /// Attach an existing account to a doctor profile and make it a doctor.
    #[instrument(skip(self))]
    pub async fn link_user_to_doctor(
        &self,
        email: &str,
        doctor_id: &str,
        actor_id: &str,
    ) -> Result<User, ApiError> {
        let user = self
            .find_user_by_email(email)
            .await?
            .ok_or(ApiError::NotFound("user"))?;

        let mut tx = self.pool().begin().await?;
        sqlx::query("UPDATE users SET role = ?, doctor_id = ?, updated_at = ? WHERE id = ?")
            .bind(Role::Doctor)
            .bind(doctor_id)
            .bind(Timestamp::now())
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        audit::record(&mut *tx, actor_id, Action::Update, "user", &user.id, doctor_id).await?;
        tx.commit().await?;

        info!(user_id = %user.id, doctor_id, "user linked to doctor");
        self.find_user(&user.id)
            .await?
            .ok_or(ApiError::NotFound("user"))
    }
}
