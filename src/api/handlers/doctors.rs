use actix_web::{web, HttpResponse};
use validator::Validate;

use super::created;
use crate::api::middleware::{authorize, AuthUser, Capability};
use crate::error::{ApiError, ApiResult};
use crate::models::doctor::{DoctorFilter, DoctorUpdate, NewDoctor};
use crate::models::Page;
use crate::AppState;

/// Public directory of published doctors.
pub async fn list_published(
    state: web::Data<AppState>,
    filter: web::Query<DoctorFilter>,
) -> ApiResult<HttpResponse> {
    let (doctors, total) = state.db.list_published_doctors(&filter).await?;
    Ok(HttpResponse::Ok().json(Page::new(doctors, &filter.pagination(), total)))
}

/// Public profile; drafts are indistinguishable from unknown slugs.
pub async fn get_published(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> ApiResult<HttpResponse> {
    match state.db.find_doctor_by_slug(&slug).await? {
        Some(doctor) if doctor.published => Ok(HttpResponse::Ok().json(doctor)),
        _ => Err(ApiError::NotFound("doctor")),
    }
}

pub async fn list_all(state: web::Data<AppState>, caller: AuthUser) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let doctors = state.db.list_all_doctors().await?;
    Ok(HttpResponse::Ok().json(doctors))
}

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<NewDoctor>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    let body = body.into_inner();
    body.validate()?;
    let doctor = state.db.create_doctor(body, caller.id()).await?;
    Ok(created(&doctor))
}

pub async fn update(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<DoctorUpdate>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::DoctorProfile(&id))?;
    let body = body.into_inner();
    if let Some(published) = body.published {
        let current = state
            .db
            .find_doctor(&id)
            .await?
            .ok_or(ApiError::NotFound("doctor"))?;
        // Only an actual change of visibility is reserved to admins.
        if published != current.published {
            authorize(&caller, Capability::Admin)?;
        }
    }
    body.validate()?;
    let doctor = state.db.update_doctor(&id, body, caller.id()).await?;
    Ok(HttpResponse::Ok().json(doctor))
}

pub async fn delete(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    authorize(&caller, Capability::Admin)?;
    state.db.delete_doctor(&id, caller.id()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// The signed-in doctor's own profile, published or not.
pub async fn own_profile(state: web::Data<AppState>, caller: AuthUser) -> ApiResult<HttpResponse> {
    let doctor_id = caller.practice()?;
    let doctor = state
        .db
        .find_doctor(doctor_id)
        .await?
        .ok_or(ApiError::NotFound("doctor"))?;
    Ok(HttpResponse::Ok().json(doctor))
}
