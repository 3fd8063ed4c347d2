// src/main.rs
use stowage::api;
use stowage::config::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Could not load .env: {}", err);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let planner_config = app_config.planner.clone();

    if planner_config.return_fill_ratio >= 1.0 {
        warn!("Return planning fills up to the hard weight limit; no safety margin");
    }

    info!("Stowage planning service starting...");
    api::start_api_server(api_config, planner_config).await;
}
