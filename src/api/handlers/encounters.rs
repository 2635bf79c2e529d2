use actix_web::{web, HttpResponse};
use validator::Validate;

use super::created;
use crate::api::middleware::AuthUser;
use crate::error::ApiResult;
use crate::models::encounter::{EncounterRevision, NewEncounter};
use crate::AppState;

pub async fn list_for_patient(
    state: web::Data<AppState>,
    caller: AuthUser,
    patient_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let patient = state.db.find_patient(doctor_id, &patient_id).await?;
    let encounters = state.db.list_encounters(doctor_id, &patient.id).await?;
    Ok(HttpResponse::Ok().json(encounters))
}

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    patient_id: web::Path<String>,
    body: web::Json<NewEncounter>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let body = body.into_inner();
    body.validate()?;
    let detail = state
        .db
        .create_encounter(doctor_id, &patient_id, body, caller.id())
        .await?;
    Ok(created(&detail))
}

pub async fn get(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let detail = state.db.encounter_detail(doctor_id, &id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Save an edit as a new version.
pub async fn revise(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<EncounterRevision>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let body = body.into_inner();
    body.validate()?;
    let detail = state
        .db
        .revise_encounter(doctor_id, &id, body, caller.id())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn sign(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let encounter = state.db.sign_encounter(doctor_id, &id, caller.id()).await?;
    Ok(HttpResponse::Ok().json(encounter))
}

pub async fn versions(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let versions = state.db.list_encounter_versions(doctor_id, &id).await?;
    Ok(HttpResponse::Ok().json(versions))
}
