//! Incident report service binary.
//!
//! Standalone HTTP service for the Slack `/incident-report` command.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use incident_report::{config::Config, server, PagerDutyClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("incident_report=info".parse()?))
        .init();

    info!("Starting incident report service...");

    // Load configuration
    let config = Config::from_env();

    for setting in config.missing_settings() {
        warn!(setting, "Required setting is not configured; requests will fail");
    }

    let provider = PagerDutyClient::new(
        &config.api_url,
        config.api_token.as_deref(),
        config.request_timeout(),
    )
    .context("Failed to create PagerDuty client")?;

    info!(api_url = %config.api_url, "PagerDuty client configured");

    let addr = format!("0.0.0.0:{}", config.port);
    let state = server::AppState {
        config: Arc::new(config),
        provider: Arc::new(provider),
    };

    server::run_server(state, &addr)
        .await
        .context("Server error")?;

    Ok(())
}
