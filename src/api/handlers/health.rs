use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Liveness plus a database round trip.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.db.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok", "database": "up" })),
        Err(e) => {
            warn!(error = %e, "database ping failed");
            HttpResponse::ServiceUnavailable()
                .json(json!({ "status": "degraded", "database": "down" }))
        }
    }
}
