use actix_web::{web, HttpResponse};
use validator::Validate;

use super::created;
use crate::api::middleware::AuthUser;
use crate::error::ApiResult;
use crate::models::appointment::{AppointmentQuery, AppointmentUpdate, NewAppointment, StatusChange};
use crate::models::Timestamp;
use crate::AppState;

pub async fn list(
    state: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<AppointmentQuery>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let (from, to) = query.window(Timestamp::now())?;
    let appointments = state
        .db
        .list_appointments(doctor_id, from, to, query.status)
        .await?;
    Ok(HttpResponse::Ok().json(appointments))
}

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<NewAppointment>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let body = body.into_inner();
    body.validate()?;
    let appointment = state.db.create_appointment(doctor_id, body).await?;
    Ok(created(&appointment))
}

pub async fn update(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<AppointmentUpdate>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let body = body.into_inner();
    body.validate()?;
    let appointment = state.db.update_appointment(doctor_id, &id, body).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

pub async fn change_status(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<StatusChange>,
) -> ApiResult<HttpResponse> {
    let doctor_id = caller.clinical_scope()?;
    let appointment = state
        .db
        .set_appointment_status(doctor_id, &id, body.status)
        .await?;
    Ok(HttpResponse::Ok().json(appointment))
}
