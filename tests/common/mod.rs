#![allow(dead_code)]

use std::sync::Arc;

use actix_web::http::header;
use actix_web::web;
use fake::faker::name::en::Name;
use fake::Fake;

use mediportal::config::{
    AssistantConfig, AuthConfig, Config, CorsConfig, DatabaseConfig, LoggingConfig, ServerConfig,
};
use mediportal::core::ai::HttpCompletionClient;
use mediportal::db::queries::users::UserRecord;
use mediportal::db::Database;
use mediportal::models::doctor::{Doctor, NewDoctor};
use mediportal::models::user::{Role, User};
use mediportal::models::Timestamp;
use mediportal::AppState;

/// Builds the service under test against `$state`.
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(mediportal::api::configure),
        )
        .await
    };
}

pub fn config(assistant_base_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            workers: 1,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "integration-secret-that-is-long-enough".into(),
            token_ttl_hours: 1,
        },
        cors: CorsConfig::default(),
        assistant: AssistantConfig {
            base_url: assistant_base_url.into(),
            api_key: "test-key".into(),
            model: "test-model".into(),
            timeout_secs: 5,
            max_history: 4,
        },
        logging: LoggingConfig::default(),
    }
}

pub async fn state_with_assistant(assistant_base_url: &str) -> web::Data<AppState> {
    let config = config(assistant_base_url);
    let db = Database::in_memory().await.expect("in-memory database");
    db.run_migrations().await.expect("migrations");
    let assistant = HttpCompletionClient::new(&config.assistant).expect("assistant client");
    web::Data::new(AppState::new(db, config, Arc::new(assistant)))
}

/// State whose assistant points at a closed port.
pub async fn state() -> web::Data<AppState> {
    state_with_assistant("http://127.0.0.1:9/v1/").await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub fn token_for(state: &AppState, user: &User) -> String {
    state
        .tokens
        .issue(user, Timestamp::now())
        .expect("token")
        .0
}

pub fn unique_email() -> String {
    format!("{}@example.com", uuid::Uuid::new_v4().simple())
}

pub async fn insert_user(
    state: &AppState,
    role: Role,
    doctor_id: Option<String>,
    password_hash: &str,
) -> User {
    let name: String = Name().fake();
    state
        .db
        .create_user(
            UserRecord {
                email: unique_email(),
                password_hash: password_hash.to_string(),
                name,
                role,
                doctor_id,
            },
            "test",
        )
        .await
        .expect("user")
}

/// An administrator and a token for it.
pub async fn admin(state: &AppState) -> (User, String) {
    let user = insert_user(state, Role::Admin, None, "unused").await;
    let token = token_for(state, &user);
    (user, token)
}

pub fn new_doctor(full_name: &str, published: bool) -> NewDoctor {
    NewDoctor {
        full_name: full_name.into(),
        specialty: "Cardiology".into(),
        city: Some("Valencia".into()),
        bio: None,
        phone: None,
        email: None,
        photo_url: None,
        license_number: None,
        years_experience: Some(10),
        published,
    }
}

pub async fn insert_doctor(state: &AppState, full_name: &str, published: bool) -> Doctor {
    state
        .db
        .create_doctor(new_doctor(full_name, published), "test")
        .await
        .expect("doctor")
}

/// A published doctor with a linked account and a token for it.
pub async fn doctor(state: &AppState) -> (Doctor, User, String) {
    let name: String = Name().fake();
    let doctor = insert_doctor(state, &format!("Dr {}", name), true).await;
    let user = insert_user(state, Role::Doctor, Some(doctor.id.clone()), "unused").await;
    let token = token_for(state, &user);
    (doctor, user, token)
}
