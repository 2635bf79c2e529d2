//! Password hashing and bearer tokens.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::models::user::{Role, User};
use crate::models::Timestamp;

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::hours(config.token_ttl_hours),
        }
    }

    pub fn issue(&self, user: &User, now: Timestamp) -> Result<(String, Timestamp), ApiError> {
        let expires_at = now.plus(self.ttl);
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            doctor_id: user.doctor_id.clone(),
            iat: now.unix(),
            exp: expires_at.unix(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token encoding: {}", e)))?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Hash on the blocking pool; argon2 is deliberately slow.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password_sync(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task: {}", e)))?
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password_sync(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task: {}", e)))?
}

/// Hash of a random secret nobody knows. Logins for unknown emails verify
/// against it so they take as long as a wrong password.
static UNKNOWN_ACCOUNT_HASH: Lazy<Option<String>> = Lazy::new(|| {
    let secret = SaltString::generate(&mut OsRng);
    hash_password_sync(secret.as_str()).ok()
});

/// Spend one verification on a login for an email that has no account.
pub async fn verify_unknown_account(password: String) -> Result<(), ApiError> {
    tokio::task::spawn_blocking(move || match UNKNOWN_ACCOUNT_HASH.as_deref() {
        Some(hash) => verify_password_sync(&password, hash).map(|_| ()),
        None => Ok(()),
    })
    .await
    .map_err(|e| ApiError::Internal(format!("verification task: {}", e)))?
}

pub fn hash_password_sync(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing: {}", e)))
}

pub fn verify_password_sync(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!("password verification: {}", e))),
    }
}
