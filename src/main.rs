//! Mediportal
//!
//! Main entry point: the HTTP server plus a few operator commands.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;
use tracing_actix_web::TracingLogger;

use mediportal::auth::hash_password;
use mediportal::config::{self, Config};
use mediportal::core::ai::HttpCompletionClient;
use mediportal::db::Database;
use mediportal::{api, cors, telemetry, AppState};

const GENERATED_PASSWORD_LEN: usize = 20;

#[derive(Debug, Parser)]
#[command(name = "mediportal", version, about = "Mediportal API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the API (default)
    Serve,
    /// Apply migrations and exit
    Migrate,
    /// Create an administrator, or reset an existing account to one
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Generated and printed when omitted
        #[arg(long, env = "MEDIPORTAL_ADMIN_PASSWORD")]
        password: Option<String>,
    },
    /// Link a user account to a doctor profile
    LinkDoctor {
        #[arg(long)]
        email: String,
        #[arg(long)]
        slug: String,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    telemetry::init(&config.logging);

    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    database
        .run_migrations()
        .await
        .context("failed to run database migrations")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, database).await,
        Command::Migrate => {
            info!("migrations applied");
            Ok(())
        }
        Command::CreateAdmin {
            email,
            name,
            password,
        } => create_admin(&database, email, name, password).await,
        Command::LinkDoctor { email, slug } => {
            let doctor = database
                .find_doctor_by_slug(&slug)
                .await?
                .with_context(|| format!("no doctor with slug `{}`", slug))?;
            let user = database.link_user_to_doctor(&email, &doctor.id, "cli").await?;
            println!("{} is now linked to {} ({})", user.email, doctor.full_name, doctor.slug);
            Ok(())
        }
    }
}

async fn serve(config: Config, database: Database) -> anyhow::Result<()> {
    let assistant = HttpCompletionClient::new(&config.assistant)?;
    let bind = (config.server.host.clone(), config.server.port);
    let workers = config.server.workers.max(1);
    let cors_config = config.cors.clone();

    let state = web::Data::new(AppState::new(database, config, Arc::new(assistant)));

    info!(host = %bind.0, port = bind.1, workers, "starting HTTP server");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&cors_config))
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .workers(workers)
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}

async fn create_admin(
    database: &Database,
    email: String,
    name: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    let generated = password.is_none();
    let password = password.unwrap_or_else(|| {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PASSWORD_LEN)
            .map(char::from)
            .collect()
    });
    anyhow::ensure!(password.len() >= 8, "password must be at least 8 characters");

    let hash = hash_password(password.clone()).await?;
    let (user, created) = database.upsert_admin(&email, &name, hash).await?;
    if created {
        println!("created administrator {}", user.email);
    } else {
        println!("reset password for {} and granted ADMIN", user.email);
    }
    if generated {
        println!("password: {}", password);
    }
    Ok(())
}
