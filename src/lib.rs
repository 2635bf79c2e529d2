//! Mediportal core library
//!
//! Doctor directory, medical records, scheduling, blog, analytics and the
//! dictation assistant behind one JSON API.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::{header, Method};

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;

use crate::auth::TokenService;
use crate::config::{Config, CorsConfig};
use crate::core::ai::CompletionClient;
use crate::db::Database;

/// Application state shared by every worker.
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub assistant: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn new(db: Database, config: Config, assistant: Arc<dyn CompletionClient>) -> Self {
        Self {
            tokens: TokenService::new(&config.auth),
            config: Arc::new(config),
            db,
            assistant,
        }
    }
}

/// CORS policy for the browser apps.
pub fn cors(config: &CorsConfig) -> Cors {
    config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600)
}
