//! Bearer-token authentication and the capability check.
//!
//! Handlers take an [`AuthUser`] argument to require a valid token, then call
//! [`authorize`] once with the capability the operation needs.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use tracing::debug;

use crate::error::ApiError;
use crate::models::user::{Role, User};
use crate::AppState;

/// The caller behind a verified bearer token, as currently stored.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn doctor_id(&self) -> Option<&str> {
        self.user.doctor_id.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// The caller's own doctor id; fails unless the account is a linked doctor.
    pub fn practice(&self) -> Result<&str, ApiError> {
        authorize(self, Capability::Portal)?;
        self.doctor_id()
            .ok_or(ApiError::Forbidden("account is not linked to a doctor"))
    }

    /// Doctor whose clinical records the caller works on.
    pub fn clinical_scope(&self) -> Result<&str, ApiError> {
        let doctor_id = self.practice()?;
        authorize(self, Capability::ClinicalRecords(doctor_id))?;
        Ok(doctor_id)
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let state =
                state.ok_or_else(|| ApiError::Internal("application state missing".into()))?;
            let token = token.ok_or(ApiError::Unauthenticated)?;
            let claims = state.tokens.verify(&token)?;

            // role and doctor link are read fresh, not taken from the token
            let user = state
                .db
                .find_user(&claims.sub)
                .await?
                .ok_or(ApiError::Unauthenticated)?;
            debug!(user_id = %user.id, role = user.role.as_str(), "request authenticated");
            Ok(AuthUser { user })
        })
    }
}

/// What an operation requires of its caller.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    /// Platform administration.
    Admin,
    /// Editing the given doctor profile.
    DoctorProfile(&'a str),
    /// Patients, encounters, prescriptions and appointments of the given doctor.
    ClinicalRecords(&'a str),
    /// The doctor portal: any account linked to a doctor.
    Portal,
    /// Editing an article with the given author.
    Article(Option<&'a str>),
}

pub fn authorize(user: &AuthUser, capability: Capability<'_>) -> Result<(), ApiError> {
    let own_doctor = |id: &str| user.doctor_id() == Some(id);

    match (user.role(), capability) {
        (Role::Admin, Capability::ClinicalRecords(_)) => {
            Err(ApiError::Forbidden("clinical records are only visible to their doctor"))
        }
        (Role::Admin, Capability::Portal) => Err(ApiError::Forbidden("doctor account required")),
        (Role::Admin, _) => Ok(()),

        (Role::Doctor, Capability::Admin) => Err(ApiError::Forbidden("admin access required")),
        (Role::Doctor, Capability::Portal) => match user.doctor_id() {
            Some(_) => Ok(()),
            None => Err(ApiError::Forbidden("account is not linked to a doctor")),
        },
        (Role::Doctor, Capability::DoctorProfile(id)) if own_doctor(id) => Ok(()),
        (Role::Doctor, Capability::DoctorProfile(_)) => {
            Err(ApiError::Forbidden("you may only edit your own profile"))
        }
        (Role::Doctor, Capability::ClinicalRecords(id)) if own_doctor(id) => Ok(()),
        (Role::Doctor, Capability::ClinicalRecords(_)) => Err(ApiError::NotFound("record")),
        (Role::Doctor, Capability::Article(Some(author))) if own_doctor(author) => Ok(()),
        (Role::Doctor, Capability::Article(_)) => Err(ApiError::NotFound("article")),
    }
}
