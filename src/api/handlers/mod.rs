//! Request handlers, one module per resource.

pub mod analytics;
pub mod appointments;
pub mod articles;
pub mod audit;
pub mod auth;
pub mod doctors;
pub mod encounters;
pub mod health;
pub mod patients;
pub mod prescriptions;
pub mod users;
pub mod voice;

use actix_web::HttpResponse;
use serde::Serialize;

pub(crate) fn created<T: Serialize>(body: &T) -> HttpResponse {
    HttpResponse::Created().json(body)
}
