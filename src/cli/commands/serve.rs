use anyhow::Context;
use clap::Args;
use std::sync::Arc;

use crate::app::app;
use crate::auth::Role;
use crate::config::AppConfig;
use crate::database::models::{normalize_email, NewUser};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    pub port: Option<u16>,

    /// Administrator created at startup when no account with this email
    /// exists. Needed to sign in to a fresh in-memory store.
    #[arg(long, env = "GATI_ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "GATI_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting GATI-C in {:?} mode", config.environment);

    let store = open_store(&config).await?;
    let state = AppState::new(config, store);

    if let (Some(email), Some(password)) = (args.admin_email, args.admin_password) {
        bootstrap_admin(&state, &email, password).await?;
    }

    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("GATI-C listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

/// Postgres when `DATABASE_URL` is set, otherwise a process-local store.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    if config.database.url.is_some() {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        Ok(Arc::new(PgStore::new(pool)))
    } else {
        if config.is_production() {
            anyhow::bail!("DATABASE_URL is required in production");
        }
        tracing::warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
        Ok(Arc::new(MemoryStore::new()))
    }
}

async fn bootstrap_admin(state: &AppState, email: &str, password: String) -> anyhow::Result<()> {
    if state.store.find_user_by_email(&normalize_email(email)).await?.is_some() {
        return Ok(());
    }
    let service = AuthService::new(state.store.clone(), state.jwt.clone());
    let user = service
        .create_user(NewUser {
            name: "Administrator".to_string(),
            email: email.to_string(),
            role: Role::Administrator,
            password,
        })
        .await?;
    tracing::info!("Bootstrapped administrator {}", user.email);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
