//! Slack request signature verification.
//!
//! Slack signs every request with HMAC-SHA256 over `v0:{timestamp}:{body}`
//! and sends the result as `X-Slack-Signature: v0=<hex>`.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request timestamp (unix seconds).
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Header carrying the `v0=` signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Signing scheme version.
const SIGNATURE_VERSION: &str = "v0";

/// Compute the `v0=<hex>` signature Slack would send for this request.
///
/// Returns `None` only if the secret cannot be used as an HMAC key.
#[must_use]
pub fn compute_slack_signature(secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mac = signing_mac(secret, timestamp, body)?;
    Some(format!(
        "{SIGNATURE_VERSION}={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify that a request was signed by Slack with `secret`.
///
/// `now` is the current unix time in seconds; the request timestamp must be
/// within `max_age_secs` of it. Signing headers are checked before the
/// secret, so an unsigned request fails the same way whether or not a
/// secret is configured.
pub fn verify_slack_request(
    headers: &HeaderMap,
    body: &[u8],
    secret: Option<&str>,
    max_age_secs: i64,
    now: i64,
) -> Result<(), AuthError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;

    let request_time: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| AuthError::InvalidTimestamp(timestamp.to_string()))?;
    validate_timestamp(request_time, now, max_age_secs)?;

    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::SecretNotConfigured)?;

    verify_signature(secret, timestamp, body, signature)
}

/// Check `signature` against the digest of `v0:{timestamp}:{body}`.
pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), AuthError> {
    let hex_digest = signature
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(AuthError::MalformedSignature)?;
    let expected = hex::decode(hex_digest).map_err(|_| AuthError::MalformedSignature)?;

    let Some(mac) = signing_mac(secret, timestamp, body) else {
        return Err(AuthError::SignatureMismatch);
    };
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    if bool::from(computed.as_slice().ct_eq(&expected)) {
        Ok(())
    } else {
        Err(AuthError::SignatureMismatch)
    }
}

/// Reject timestamps further than `max_age_secs` from `now` in either direction.
pub fn validate_timestamp(timestamp: i64, now: i64, max_age_secs: i64) -> Result<(), AuthError> {
    let age_secs = now.saturating_sub(timestamp).saturating_abs();
    if age_secs > max_age_secs {
        return Err(AuthError::StaleTimestamp {
            age_secs,
            max_age_secs,
        });
    }
    Ok(())
}

fn signing_mac(secret: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) else {
        return None;
    };
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(mac)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    fn signed_headers(secret: &str, timestamp: &str, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&compute_slack_signature(secret, timestamp, body).unwrap())
                .unwrap(),
        );
        headers
    }

    #[test]
    fn test_slack_documented_example() {
        // Example from Slack's "Verifying requests from Slack" guide.
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
        let signature = compute_slack_signature(SECRET, "1531420618", body).unwrap();
        assert_eq!(
            signature,
            "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"
        );
    }

    #[test]
    fn test_valid_request_passes() {
        let body = b"text=%22Checkout%22+%22Payments+down%22";
        let headers = signed_headers(SECRET, "1531420618", body);
        assert_eq!(
            verify_slack_request(&headers, body, Some(SECRET), 300, NOW),
            Ok(())
        );
    }

    #[test]
    fn test_any_single_byte_mutation_fails() {
        let body = b"command=%2Fincident-report&text=%22API%22+%22down%22".to_vec();
        let headers = signed_headers(SECRET, "1531420618", &body);

        for i in 0..body.len() {
            let mut mutated = body.clone();
            mutated[i] ^= 0x01;
            assert_eq!(
                verify_slack_request(&headers, &mutated, Some(SECRET), 300, NOW),
                Err(AuthError::SignatureMismatch),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let body = b"text=hello";
        let headers = signed_headers("other-secret", "1531420618", body);
        assert_eq!(
            verify_slack_request(&headers, body, Some(SECRET), 300, NOW),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn test_missing_secret_fails_closed() {
        let body = b"text=hello";
        let headers = signed_headers("", "1531420618", body);
        assert_eq!(
            verify_slack_request(&headers, body, None, 300, NOW),
            Err(AuthError::SecretNotConfigured)
        );
        assert_eq!(
            verify_slack_request(&headers, body, Some(""), 300, NOW),
            Err(AuthError::SecretNotConfigured)
        );
    }

    #[test]
    fn test_missing_headers() {
        let body = b"text=hello";
        let mut headers = signed_headers(SECRET, "1531420618", body);
        headers.remove(SIGNATURE_HEADER);
        assert_eq!(
            verify_slack_request(&headers, body, Some(SECRET), 300, NOW),
            Err(AuthError::MissingHeader(SIGNATURE_HEADER))
        );

        let mut headers = signed_headers(SECRET, "1531420618", body);
        headers.remove(TIMESTAMP_HEADER);
        assert_eq!(
            verify_slack_request(&headers, body, Some(SECRET), 300, NOW),
            Err(AuthError::MissingHeader(TIMESTAMP_HEADER))
        );
    }

    #[test]
    fn test_malformed_signature() {
        let body = b"text=hello";
        for bad in ["a2114d57", "v1=a2114d57", "v0=not-hex", "v0"] {
            let mut headers = signed_headers(SECRET, "1531420618", body);
            headers.insert(SIGNATURE_HEADER, HeaderValue::from_static(bad));
            assert_eq!(
                verify_slack_request(&headers, body, Some(SECRET), 300, NOW),
                Err(AuthError::MalformedSignature),
                "{bad} was not rejected as malformed"
            );
        }
    }

    #[test]
    fn test_non_numeric_timestamp() {
        let body = b"text=hello";
        let headers = signed_headers(SECRET, "yesterday", body);
        assert_eq!(
            verify_slack_request(&headers, body, Some(SECRET), 300, NOW),
            Err(AuthError::InvalidTimestamp("yesterday".to_string()))
        );
    }

    #[test]
    fn test_stale_timestamp() {
        let body = b"text=hello";
        let headers = signed_headers(SECRET, "1531420618", body);
        assert_eq!(
            verify_slack_request(&headers, body, Some(SECRET), 300, NOW + 301),
            Err(AuthError::StaleTimestamp {
                age_secs: 301,
                max_age_secs: 300
            })
        );
    }

    #[test]
    fn test_headers_checked_before_secret() {
        let body = b"text=hello";
        assert_eq!(
            verify_slack_request(&HeaderMap::new(), body, None, 300, NOW),
            Err(AuthError::MissingHeader(TIMESTAMP_HEADER))
        );
    }

    #[test]
    fn test_empty_key_still_signs() {
        let signature = compute_slack_signature("", "1531420618", b"text=hello").unwrap();
        assert!(signature.starts_with("v0="));
        assert_eq!(signature.len(), "v0=".len() + 64);
    }

    #[test]
    fn test_validate_timestamp_window() {
        assert!(validate_timestamp(NOW, NOW, 300).is_ok());
        assert!(validate_timestamp(NOW - 300, NOW, 300).is_ok());
        assert!(validate_timestamp(NOW + 300, NOW, 300).is_ok());
        assert!(validate_timestamp(NOW - 301, NOW, 300).is_err());
        assert!(validate_timestamp(NOW + 301, NOW, 300).is_err());
    }
}
