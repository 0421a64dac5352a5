use anyhow::Result;
use medassist::{config, server};
use tracing::info;

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup); a missing API key stops here
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = &config.server.logs.level;
    if let Err(e) = validate_log_level(log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // RUST_LOG directives, when present, take precedence over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .json()
        .init();

    info!("Starting medassist server with log level: {}", log_level);
    info!(
        "Configuration loaded (provider: {}, upstream: {})",
        config.llm.provider, config.llm.base_url
    );

    server::run(config).await?;

    Ok(())
}
