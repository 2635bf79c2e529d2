use actix_web::{web, HttpResponse};
use validator::Validate;

use super::created;
use crate::api::middleware::{authorize, AuthUser, Capability};
use crate::auth::hash_password;
use crate::db::queries::users::UserRecord;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{NewUser, Role};
use crate::AppState;

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<NewUser>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let body = body.into_inner();
    body.validate()?;

    let doctor_id = match body.role {
        Role::Admin => None,
        Role::Doctor => {
            let id = body
                .doctor_id
                .ok_or_else(|| ApiError::invalid("doctor_id", "is required for doctor accounts"))?;
            state
                .db
                .find_doctor(&id)
                .await?
                .ok_or_else(|| ApiError::invalid("doctor_id", "does not reference a doctor"))?;
            Some(id)
        }
    };

    let record = UserRecord {
        email: body.email,
        password_hash: hash_password(body.password).await?,
        name: body.name.trim().to_string(),
        role: body.role,
        doctor_id,
    };
    let user = state.db.create_user(record, caller.id()).await?;
    Ok(created(&user))
}

pub async fn list(state: web::Data<AppState>, caller: AuthUser) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let users = state.db.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}
