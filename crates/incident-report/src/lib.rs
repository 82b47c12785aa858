//! Slack slash command webhook that opens `PagerDuty` incidents.
//!
//! `/incident-report "<Service Name>" "<Description>"` is handled as:
//! - Slack request signature verification
//! - Parsing of the two quoted arguments
//! - Exact-name service lookup in `PagerDuty`
//! - Incident creation on behalf of a configured sender

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Documented on the error types instead

pub mod command;
pub mod config;
pub mod error;
pub mod pagerduty;
pub mod report;
pub mod server;
pub mod webhooks;

pub use command::{parse_command, ParsedArguments, SlashCommand};
pub use config::Config;
pub use error::{AuthError, FormatError, ProviderError, ReportError};
pub use pagerduty::{IncidentId, IncidentProvider, PagerDutyClient, ServiceSummary};
pub use report::{create_incident, handle_report, resolve_service, Incident, ServiceReference};
pub use server::{build_router, AppState};
pub use webhooks::{compute_slack_signature, verify_slack_request};
