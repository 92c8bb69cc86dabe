use anyhow::Context;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("migrate needs DATABASE_URL")?;
    DatabaseManager::migrate(&pool).await?;
    output_success(output_format, "Migrations applied", None)
}
