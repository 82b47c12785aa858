//! HTTP server for the `/incident-report` slash command.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::ReportError;
use crate::pagerduty::IncidentProvider;
use crate::report::handle_report;

/// Response text for a successfully created incident.
pub const SUCCESS_MESSAGE: &str = "Incident reported successfully";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration, loaded once at startup.
    pub config: Arc<Config>,
    /// Incident provider client.
    pub provider: Arc<dyn IncidentProvider>,
}

/// Build the HTTP router for the incident report service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/incident-report", post(incident_report_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process stops.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Incident report service listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Handle a Slack `/incident-report` slash command.
///
/// The body is buffered once; signature verification and payload parsing
/// both read that buffer.
pub async fn incident_report_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<&'static str, ReportError> {
    let body = body.map_err(|e| ReportError::Transport(e.body_text()))?;
    let now = chrono::Utc::now().timestamp();

    let incident = handle_report(
        &state.config,
        state.provider.as_ref(),
        &headers,
        &body,
        now,
    )
    .await?;

    info!(incident_id = %incident.id, "Incident report completed");

    Ok(SUCCESS_MESSAGE)
}
