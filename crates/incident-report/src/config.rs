//! Configuration for the incident report service.

use std::env;
use std::time::Duration;

/// Default `PagerDuty` REST API base URL.
pub const DEFAULT_PAGERDUTY_API_URL: &str = "https://api.pagerduty.com";

/// Incident report service configuration.
///
/// Built once at startup and shared with every request.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Slack signing secret for request verification.
    pub signing_secret: Option<String>,
    /// Maximum distance between the Slack request timestamp and now.
    pub max_timestamp_age_secs: i64,
    /// `PagerDuty` REST API token.
    pub api_token: Option<String>,
    /// Email incidents are created on behalf of.
    pub from_email: Option<String>,
    /// `PagerDuty` REST API base URL.
    pub api_url: String,
    /// Timeout for each outbound `PagerDuty` request.
    pub request_timeout_secs: u64,
}

impl Config {
    /// Read configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            signing_secret: non_empty_var("SLACK_SIGNING_SECRET"),
            max_timestamp_age_secs: env::var("SLACK_MAX_TIMESTAMP_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            api_token: non_empty_var("PAGERDUTY_API_TOKEN"),
            from_email: non_empty_var("PAGERDUTY_EMAIL"),
            api_url: non_empty_var("PAGERDUTY_API_URL")
                .unwrap_or_else(|| DEFAULT_PAGERDUTY_API_URL.to_string()),
            request_timeout_secs: env::var("PAGERDUTY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Outbound request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Names of required settings that are unset.
    #[must_use]
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.signing_secret.is_none() {
            missing.push("SLACK_SIGNING_SECRET");
        }
        if self.api_token.is_none() {
            missing.push("PAGERDUTY_API_TOKEN");
        }
        if self.from_email.is_none() {
            missing.push("PAGERDUTY_EMAIL");
        }
        missing
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

// Secrets must not end up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<redacted>"))
            .field("max_timestamp_age_secs", &self.max_timestamp_age_secs)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("from_email", &self.from_email)
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
