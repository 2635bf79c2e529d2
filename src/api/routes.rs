//! URL layout of the `/api` scope.

use actix_web::{error::InternalError, web, HttpResponse};

use super::handlers::{
    analytics, appointments, articles, audit, auth, doctors, encounters, health, patients,
    prescriptions, users, voice,
};
use crate::error::ApiError;

const MAX_JSON_BYTES: usize = 256 * 1024;

fn rejected<E>(err: E, api: ApiError) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    let response = actix_web::ResponseError::error_response(&api);
    InternalError::from_response(err, response).into()
}

/// Malformed bodies answer with the regular error body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BYTES)
        .error_handler(|err, _| {
            let api = ApiError::Validation(format!("invalid JSON body: {}", err));
            rejected(err, api)
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| {
        let api = ApiError::Validation(format!("invalid query string: {}", err));
        rejected(err, api)
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _| {
        let api = ApiError::Validation(format!("invalid path: {}", err));
        rejected(err, api)
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .route("/health", web::get().to(health::health))
            // auth
            .route("/auth/login", web::post().to(auth::login))
            .route("/auth/me", web::get().to(auth::me))
            // administration
            .service(
                web::resource("/admin/users")
                    .route(web::get().to(users::list))
                    .route(web::post().to(users::create)),
            )
            .route("/admin/doctors", web::get().to(doctors::list_all))
            .route("/admin/audit", web::get().to(audit::list))
            // doctors
            .service(
                web::resource("/doctors")
                    .route(web::get().to(doctors::list_published))
                    .route(web::post().to(doctors::create)),
            )
            .service(
                web::resource("/doctors/{key}")
                    .route(web::get().to(doctors::get_published))
                    .route(web::put().to(doctors::update))
                    .route(web::delete().to(doctors::delete)),
            )
            // doctor portal
            .route("/portal/profile", web::get().to(doctors::own_profile))
            .route("/portal/articles", web::get().to(articles::list_for_portal))
            // medical records
            .service(
                web::resource("/patients")
                    .route(web::get().to(patients::list))
                    .route(web::post().to(patients::create)),
            )
            .service(
                web::resource("/patients/{id}")
                    .route(web::get().to(patients::get))
                    .route(web::put().to(patients::update))
                    .route(web::delete().to(patients::delete)),
            )
            .service(
                web::resource("/patients/{id}/encounters")
                    .route(web::get().to(encounters::list_for_patient))
                    .route(web::post().to(encounters::create)),
            )
            .service(
                web::resource("/patients/{id}/prescriptions")
                    .route(web::get().to(prescriptions::list_for_patient))
                    .route(web::post().to(prescriptions::create)),
            )
            .service(
                web::resource("/encounters/{id}")
                    .route(web::get().to(encounters::get))
                    .route(web::put().to(encounters::revise)),
            )
            .route("/encounters/{id}/sign", web::post().to(encounters::sign))
            .route("/encounters/{id}/versions", web::get().to(encounters::versions))
            .route("/prescriptions/{id}", web::get().to(prescriptions::get))
            .route("/prescriptions/{id}/cancel", web::post().to(prescriptions::cancel))
            // appointments
            .service(
                web::resource("/appointments")
                    .route(web::get().to(appointments::list))
                    .route(web::post().to(appointments::create)),
            )
            .route("/appointments/{id}", web::put().to(appointments::update))
            .route(
                "/appointments/{id}/status",
                web::patch().to(appointments::change_status),
            )
            // blog
            .service(
                web::resource("/articles")
                    .route(web::get().to(articles::list_published))
                    .route(web::post().to(articles::create)),
            )
            .service(
                web::resource("/articles/{key}")
                    .route(web::get().to(articles::get_published))
                    .route(web::put().to(articles::update))
                    .route(web::delete().to(articles::delete)),
            )
            // analytics
            .route("/analytics/events", web::post().to(analytics::record))
            .route("/analytics/doctor", web::get().to(analytics::doctor))
            .route("/analytics/platform", web::get().to(analytics::platform))
            .route("/analytics/top-doctors", web::get().to(analytics::top_doctors))
            // voice assistant
            .route("/voice/extract", web::post().to(voice::extract))
            .route(
                "/voice/memory/{session_key}",
                web::delete().to(voice::clear_memory),
            )
            .default_service(web::to(|| async {
                HttpResponse::NotFound().json(serde_json::json!({
                    "error": { "code": "NOT_FOUND", "message": "route not found" }
                }))
            })),
    );
}
