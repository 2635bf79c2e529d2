use actix_web::{web, HttpResponse};
use validator::Validate;

use super::created;
use crate::api::middleware::AuthUser;
use crate::error::ApiResult;
use crate::models::patient::{PatientInput, PatientQuery};
use crate::models::{Page, Timestamp};
use crate::AppState;

fn checked(input: PatientInput) -> ApiResult<PatientInput> {
    let input = input.normalized();
    input.validate()?;
    input.check_dates(Timestamp::now().0.date_naive())?;
    Ok(input)
}

pub async fn list(
    state: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<PatientQuery>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let (patients, total) = state.db.list_patients(doctor_id, &query).await?;
    Ok(HttpResponse::Ok().json(Page::new(patients, &query.pagination(), total)))
}

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<PatientInput>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let input = checked(body.into_inner())?;
    let patient = state.db.create_patient(doctor_id, input, caller.id()).await?;
    Ok(created(&patient))
}

pub async fn get(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let patient = state.db.find_patient(doctor_id, &id).await?;
    Ok(HttpResponse::Ok().json(patient))
}

pub async fn update(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<PatientInput>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let input = checked(body.into_inner())?;
    let patient = state
        .db
        .update_patient(doctor_id, &id, input, caller.id())
        .await?;
    Ok(HttpResponse::Ok().json(patient))
}

pub async fn delete(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    state.db.delete_patient(doctor_id, &id, caller.id()).await?;
    Ok(HttpResponse::NoContent().finish())
}
