use anyhow::Context;
use tracing_subscriber::EnvFilter;

use api_host::config::AppConfig;
use api_host::host::Host;
use api_host::services::{HealthV1, UserDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up keys and settings
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("failed to load settings")?;
    tracing::info!("Starting API host in {:?} mode", config.environment);

    let users = match &config.users_file {
        Some(path) => UserDirectory::from_file(path)?,
        None => {
            tracing::warn!("no users file configured; protected routes will reject every caller");
            UserDirectory::default()
        }
    };

    let app = Host::new(config)
        .use_authorize(users)
        .use_service(HealthV1)
        .build()
        .context("host configuration rejected")?;

    app.run().await?;
    Ok(())
}
