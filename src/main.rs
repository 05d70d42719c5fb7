use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod db;
mod error;
mod export;
mod mailer;
mod models;
mod service;

use api::AppState;
use auth::SessionStore;
use config::AppConfig;
use mailer::Mailer;

#[derive(Parser)]
#[command(name = "qareebeen")]
#[command(about = "University suggestion and inquiry intake service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Insert the fixed admin identity
    Seed {
        #[arg(long, default_value = "admin@qareebeen.com")]
        email: String,
        #[arg(long, default_value = "Admin")]
        name: String,
    },
    /// Run the HTTP intake and admin API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("qareebeen=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { email, name } => {
            let password = std::env::var("SEED_ADMIN_PASSWORD")
                .context("SEED_ADMIN_PASSWORD must be set to seed the admin account")?;
            let hash = auth::hash_password(&password)?;
            db::seed_admin(&pool, &email, &hash, &name).await?;
            println!("Admin account ready: {email}");
        }
        Commands::Serve => {
            let config = Arc::new(AppConfig::from_env());
            let sessions =
                SessionStore::new(Duration::from_secs(config.session_ttl_minutes * 60));
            let mailer = Arc::new(Mailer::new(
                config.mail_api_url.clone(),
                config.mail_api_token.clone(),
                config.mail_from.clone(),
            ));

            if config.mail_api_url.is_none() {
                tracing::warn!("MAIL_API_URL not set, notification emails are disabled");
            }

            let state = AppState {
                pool,
                sessions,
                mailer,
                config: config.clone(),
            };

            let router = api::build_router(state);
            let listener = tokio::net::TcpListener::bind(config.http_addr)
                .await
                .with_context(|| format!("failed to bind {}", config.http_addr))?;

            tracing::info!(addr = %config.http_addr, "qareebeen intake service listening");
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
