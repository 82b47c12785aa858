//! `PagerDuty` integration for service lookup and incident creation.
//!
//! This module talks to the `PagerDuty` REST API v2. The pipeline only depends
//! on the [`IncidentProvider`] trait so tests can substitute a fake.
//!
//! # Usage
//!
//! ```no_run
//! use incident_report::pagerduty::{IncidentProvider, PagerDutyClient};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = PagerDutyClient::new(
//!     "https://api.pagerduty.com",
//!     Some("u+abcdefg"),
//!     Duration::from_secs(30),
//! )?;
//!
//! let services = client.search_services("Checkout").await?;
//! if let Some(service) = services.iter().find(|s| s.name == "Checkout") {
//!     let incident = client
//!         .create_incident(&service.id, "Payments down", "oncall@example.com")
//!         .await?;
//!     println!("opened {}", incident.0);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::ProviderError;

/// `PagerDuty` REST API v2 media type.
const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

/// Header naming the user an incident is created on behalf of.
const FROM_HEADER: &str = "From";

/// A candidate returned by a service directory search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceSummary {
    /// Provider-assigned service ID.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Identifier of a created incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentId(pub String);

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incident-management provider operations used by the report pipeline.
#[async_trait]
pub trait IncidentProvider: Send + Sync {
    /// Search the service directory. Results may include near matches.
    async fn search_services(&self, query: &str) -> Result<Vec<ServiceSummary>, ProviderError>;

    /// Open an incident titled `title` on `service_id`, attributed to `from_email`.
    async fn create_incident(
        &self,
        service_id: &str,
        title: &str,
        from_email: &str,
    ) -> Result<IncidentId, ProviderError>;
}

/// `PagerDuty` REST API client.
#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    /// `None` when no API token is configured.
    client: Option<reqwest::Client>,
    api_url: String,
}

impl PagerDutyClient {
    /// Create a client for `api_url`.
    ///
    /// A missing token is not an error here: every call then fails with
    /// [`ProviderError::NotConfigured`].
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(
        api_url: &str,
        api_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = match api_token {
            Some(token) => {
                let mut auth_value =
                    HeaderValue::from_str(&format!("Token token={token}")).map_err(|_| {
                        ProviderError::NotConfigured(
                            "PagerDuty API token contains invalid characters".to_string(),
                        )
                    })?;
                auth_value.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, auth_value);
                headers.insert(ACCEPT, HeaderValue::from_static(PAGERDUTY_ACCEPT));
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

                Some(
                    reqwest::Client::builder()
                        .default_headers(headers)
                        .timeout(timeout)
                        .build()?,
                )
            }
            None => None,
        };

        debug!(api_url = %api_url, configured = client.is_some(), "PagerDuty client initialized");

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn http(&self) -> Result<&reqwest::Client, ProviderError> {
        self.client.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured("PagerDuty API token not configured".to_string())
        })
    }

    /// Read a response, turning non-2xx statuses into [`ProviderError::Api`].
    async fn read_response<R: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, ProviderError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, body = %body, "PagerDuty API request failed");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl IncidentProvider for PagerDutyClient {
    #[instrument(skip(self))]
    async fn search_services(&self, query: &str) -> Result<Vec<ServiceSummary>, ProviderError> {
        let response = self
            .http()?
            .get(format!("{}/services", self.api_url))
            .query(&[("query", query)])
            .send()
            .await?;

        let page: ServiceListResponse = Self::read_response(response).await?;

        if page.more {
            // Only the first page is considered.
            warn!(
                returned = page.services.len(),
                "PagerDuty service search has more results than the first page"
            );
        }
        debug!(count = page.services.len(), "PagerDuty service search completed");

        Ok(page.services)
    }

    #[instrument(skip(self, title))]
    async fn create_incident(
        &self,
        service_id: &str,
        title: &str,
        from_email: &str,
    ) -> Result<IncidentId, ProviderError> {
        let request = CreateIncidentRequest {
            incident: NewIncident {
                kind: "incident",
                title,
                service: ApiReference {
                    id: service_id,
                    kind: "service_reference",
                },
            },
        };

        let response = self
            .http()?
            .post(format!("{}/incidents", self.api_url))
            .header(FROM_HEADER, from_email)
            .json(&request)
            .send()
            .await?;

        let created: IncidentResponse = Self::read_response(response).await?;
        Ok(IncidentId(created.incident.id))
    }
}

/// Best-effort extraction of `PagerDuty`'s `{"error": {...}}` body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(ApiErrorResponse { error }) if error.errors.is_empty() => error.message,
        Ok(ApiErrorResponse { error }) => {
            format!("{} ({})", error.message, error.errors.join("; "))
        }
        Err(_) => body.to_string(),
    }
}

// =============================================================================
// API types (internal)
// =============================================================================

#[derive(Debug, Deserialize)]
struct ServiceListResponse {
    #[serde(default)]
    services: Vec<ServiceSummary>,
    #[serde(default)]
    more: bool,
}

#[derive(Debug, Serialize)]
struct CreateIncidentRequest<'a> {
    incident: NewIncident<'a>,
}

#[derive(Debug, Serialize)]
struct NewIncident<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    service: ApiReference<'a>,
}

#[derive(Debug, Serialize)]
struct ApiReference<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct IncidentResponse {
    incident: CreatedIncident,
}

#[derive(Debug, Deserialize)]
struct CreatedIncident {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<String>,
}
