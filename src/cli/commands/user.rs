use anyhow::Context;
use clap::Args;
use serde_json::json;
use std::sync::Arc;

use crate::auth::{JwtKeys, Role};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::NewUser;
use crate::database::{DatabaseManager, PgStore};
use crate::services::AuthService;

#[derive(Debug, Args)]
pub struct CreateUserArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long, default_value = "reader", help = "reader, editor or administrator")]
    pub role: Role,

    #[arg(long, env = "GATI_USER_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl From<CreateUserArgs> for NewUser {
    fn from(args: CreateUserArgs) -> Self {
        NewUser { name: args.name, email: args.email, role: args.role, password: args.password }
    }
}

pub async fn handle(args: CreateUserArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("create-user needs DATABASE_URL")?;
    DatabaseManager::migrate(&pool).await?;

    let jwt = Arc::new(JwtKeys::from_config(&config.security));
    let service = AuthService::new(Arc::new(PgStore::new(pool)), jwt);
    let user = service.create_user(args.into()).await?;

    output_success(
        output_format,
        &format!("Created {} ({})", user.email, user.role),
        Some(json!(user)),
    )
}
