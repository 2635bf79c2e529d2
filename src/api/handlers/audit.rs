use actix_web::{web, HttpResponse};

use crate::api::middleware::{authorize, AuthUser, Capability};
use crate::audit::AuditQuery;
use crate::error::ApiResult;
use crate::AppState;

pub async fn list(
    state: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<AuditQuery>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let entries = state.db.list_audit(&query).await?;
    Ok(HttpResponse::Ok().json(entries))
}
