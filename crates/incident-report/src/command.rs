//! Slack slash command payload and `/incident-report` argument parsing.

use regex::Regex;
use serde::de::{value::MapDeserializer, Error as _};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::FormatError;

/// Two double-quoted, quote-free fields separated by ASCII whitespace.
static COMMAND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"]+)"[\t\n\f\r ]+"([^"]+)"$"#).unwrap());

/// Form-encoded payload Slack posts for a slash command.
///
/// Only `text` drives the pipeline; the remaining fields are kept for logging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlashCommand {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub enterprise_id: String,
    pub enterprise_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
    pub api_app_id: String,
}

impl SlashCommand {
    /// Decode a raw `application/x-www-form-urlencoded` body.
    ///
    /// Repeated fields keep their first value. Bad percent escapes and bare
    /// `;` separators are rejected.
    pub fn parse(body: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        check_form_syntax(body)?;

        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
        let mut seen = HashSet::new();
        let first_values = pairs
            .into_iter()
            .filter(|(key, _)| seen.insert(key.clone()));

        Self::deserialize(MapDeserializer::new(first_values))
    }
}

fn check_form_syntax(body: &[u8]) -> Result<(), serde_urlencoded::de::Error> {
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b';' => {
                return Err(serde_urlencoded::de::Error::custom(
                    "invalid semicolon separator in form body",
                ))
            }
            b'%' => {
                let escape = body.get(i + 1..i + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return Err(serde_urlencoded::de::Error::custom(format!(
                        "invalid URL escape at byte {i}"
                    )));
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

/// Arguments of `/incident-report "<service>" "<description>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArguments {
    /// Service name, matched exactly against the provider directory.
    pub service_name: String,
    /// Incident title.
    pub description: String,
}

/// Extract the service name and description from the command text.
pub fn parse_command(text: &str) -> Result<ParsedArguments, FormatError> {
    let captures = COMMAND_PATTERN.captures(text).ok_or(FormatError)?;

    Ok(ParsedArguments {
        service_name: captures[1].to_string(),
        description: captures[2].to_string(),
    })
}
