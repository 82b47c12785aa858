//! Error types for the incident report pipeline.
//!
//! Every failure is resolved at the request boundary: [`ReportError`] knows
//! which HTTP status and user-facing text it maps to.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Reasons a webhook request failed authentication.
///
/// The variant is logged for operators but never echoed to the caller.
/// Missing or unusable signing headers are request faults (500); only a
/// signature that cannot be accepted is unauthorized (401).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No signing secret configured, so nothing can be verified.
    #[error("signing secret not configured")]
    SecretNotConfigured,

    /// A required signing header is absent or not valid UTF-8.
    #[error("missing or unreadable header: {0}")]
    MissingHeader(&'static str),

    /// Timestamp header is not an integer.
    #[error("invalid request timestamp: {0}")]
    InvalidTimestamp(String),

    /// Timestamp falls outside the replay window.
    #[error("request timestamp is {age_secs}s away from now (max {max_age_secs}s)")]
    StaleTimestamp { age_secs: i64, max_age_secs: i64 },

    /// Signature header lacks the version prefix or is not hex.
    #[error("malformed signature header")]
    MalformedSignature,

    /// Computed digest does not match the header.
    #[error("signature mismatch")]
    SignatureMismatch,
}

impl AuthError {
    /// Whether the signature itself was rejected, as opposed to the signing
    /// headers being absent or unusable.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::SecretNotConfigured | Self::MalformedSignature | Self::SignatureMismatch
        )
    }
}

/// The command text did not match `"<service>" "<description>"`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("input must be in format: /incident-report \"Service Name\" \"Description\"")]
pub struct FormatError;

/// Failures talking to the incident provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Client is missing credentials.
    #[error("{0}")]
    NotConfigured(String),

    /// Network or protocol failure before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Provider answered 2xx but the body was not what we expected.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// A failed incident report, one variant per outcome class.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Signature verification failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Request body could not be read.
    #[error("failed to read request body: {0}")]
    Transport(String),

    /// Slack's own form payload could not be decoded.
    #[error("failed to parse slash command payload: {0}")]
    Payload(#[from] serde_urlencoded::de::Error),

    /// User-supplied command text is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// `PAGERDUTY_EMAIL` is unset.
    #[error("sender email not configured")]
    MissingFromEmail,

    /// Service directory lookup failed.
    #[error("service lookup failed: {0}")]
    ServiceLookup(#[source] ProviderError),

    /// No service carries exactly the requested name.
    #[error("no service named {service:?}")]
    ServiceNotFound { service: String },

    /// Incident creation failed.
    #[error("incident creation failed: {0}")]
    IncidentCreation(#[source] ProviderError),
}

impl ReportError {
    /// HTTP status returned to Slack.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(e) if e.is_unauthorized() => StatusCode::UNAUTHORIZED,
            Self::Auth(_) | Self::Transport(_) | Self::Payload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::OK,
        }
    }

    /// Plain-text body shown to the user who ran the command.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(_) | Self::Transport(_) | Self::Payload(_) => String::new(),
            Self::Format(e) => format!("Error parsing input: {e}"),
            Self::MissingFromEmail => {
                "No 'from' email configured. Set PAGERDUTY_EMAIL environment variable.".to_string()
            }
            Self::ServiceLookup(e) => format!("Error checking service: {e}"),
            Self::ServiceNotFound { .. } => "No such service found in PagerDuty".to_string(),
            Self::IncidentCreation(e) => format!("Error creating incident: {e}"),
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        match &self {
            Self::Format(_) | Self::ServiceNotFound { .. } => {
                warn!(error = %self, "Incident report rejected");
            }
            Self::Auth(e) if e.is_unauthorized() => {
                warn!(error = %self, "Rejected unauthenticated request");
            }
            _ => error!(error = %self, "Incident report failed"),
        }

        (self.status(), self.user_message()).into_response()
    }
}
