use actix_web::{web, HttpResponse};
use tracing::{info, warn};
use validator::Validate;

use crate::api::middleware::AuthUser;
use crate::auth::{verify_password, verify_unknown_account};
use crate::error::{ApiError, ApiResult};
use crate::models::user::{LoginRequest, LoginResponse};
use crate::models::Timestamp;
use crate::AppState;

/// Exchange credentials for a bearer token.
///
/// Unknown emails and wrong passwords produce the same response.
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    body.validate()?;

    let Some(user) = state.db.find_user_by_email(&body.email).await? else {
        warn!("login for unknown email");
        verify_unknown_account(body.password).await?;
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(body.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let (token, expires_at) = state.tokens.issue(&user, Timestamp::now())?;
    info!(user_id = %user.id, role = user.role.as_str(), "user logged in");
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

pub async fn me(caller: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(caller.user)
}
