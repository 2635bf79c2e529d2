use actix_web::{web, HttpResponse};

use super::created;
use crate::api::middleware::AuthUser;
use crate::error::ApiResult;
use crate::models::prescription::NewPrescription;
use crate::AppState;

pub async fn list_for_patient(
    state: web::Data<AppState>,
    caller: AuthUser,
    patient_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let prescriptions = state.db.list_prescriptions(doctor_id, &patient_id).await?;
    Ok(HttpResponse::Ok().json(prescriptions))
}

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    patient_id: web::Path<String>,
    body: web::Json<NewPrescription>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let body = body.into_inner();
    body.check()?;
    let prescription = state
        .db
        .create_prescription(doctor_id, &patient_id, body, caller.id())
        .await?;
    Ok(created(&prescription))
}

pub async fn get(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let prescription = state.db.find_prescription(doctor_id, &id).await?;
    Ok(HttpResponse::Ok().json(prescription))
}

pub async fn cancel(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let prescription = state
        .db
        .cancel_prescription(doctor_id, &id, caller.id())
        .await?;
    Ok(HttpResponse::Ok().json(prescription))
}
