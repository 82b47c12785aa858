//! The incident report pipeline.
//!
//! Authenticate, parse, resolve the service, create the incident. Each step
//! short-circuits the rest; nothing is retried.

use axum::http::HeaderMap;
use tracing::{debug, info};

use crate::command::{parse_command, SlashCommand};
use crate::config::Config;
use crate::error::{ProviderError, ReportError};
use crate::pagerduty::{IncidentId, IncidentProvider};
use crate::webhooks::verify_slack_request;

/// A service resolved by exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReference {
    pub id: String,
}

/// A created incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub id: IncidentId,
}

/// Find the service whose name is exactly `service_name`.
///
/// `Ok(None)` means the search worked but no candidate matched exactly.
/// Only the first page of search results is considered.
pub async fn resolve_service(
    provider: &dyn IncidentProvider,
    service_name: &str,
) -> Result<Option<ServiceReference>, ProviderError> {
    let candidates = provider.search_services(service_name).await?;

    debug!(
        service = %service_name,
        candidates = candidates.len(),
        "Scanning service search results"
    );

    Ok(candidates
        .into_iter()
        .find(|candidate| candidate.name == service_name)
        .map(|candidate| ServiceReference { id: candidate.id }))
}

/// Open an incident on `service` titled `title`, on behalf of `from_email`.
pub async fn create_incident(
    provider: &dyn IncidentProvider,
    service: &ServiceReference,
    title: &str,
    from_email: &str,
) -> Result<Incident, ProviderError> {
    let id = provider.create_incident(&service.id, title, from_email).await?;

    info!(incident_id = %id, service_id = %service.id, "Created incident");

    Ok(Incident { id })
}

/// Run one slash command request through the whole pipeline.
///
/// `now` is the current unix time in seconds, used for the replay window.
pub async fn handle_report(
    config: &Config,
    provider: &dyn IncidentProvider,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<Incident, ReportError> {
    verify_slack_request(
        headers,
        body,
        config.signing_secret.as_deref(),
        config.max_timestamp_age_secs,
        now,
    )?;

    let command = SlashCommand::parse(body)?;

    info!(
        user = %command.user_name,
        channel = %command.channel_name,
        team = %command.team_domain,
        "Received incident report command"
    );

    let args = parse_command(&command.text)?;

    let from_email = config
        .from_email
        .as_deref()
        .ok_or(ReportError::MissingFromEmail)?;

    let service = resolve_service(provider, &args.service_name)
        .await
        .map_err(ReportError::ServiceLookup)?
        .ok_or_else(|| ReportError::ServiceNotFound {
            service: args.service_name.clone(),
        })?;

    create_incident(provider, &service, &args.description, from_email)
        .await
        .map_err(ReportError::IncidentCreation)
}
