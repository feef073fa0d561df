use tracing::info;
use tracing_subscriber::EnvFilter;

use tryon_relay::{server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    info!("=== Try-on relay starting ===");

    let config = Config::from_env()?;
    server::run(config).await
}
