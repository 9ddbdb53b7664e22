//! Credential scrubbing for driver error text

/// Replacement for any credential found in a message
pub const REDACTED: &str = "******";

/// Replace every occurrence of `secret` in `message`, both raw and in its
/// URL-encoded form (drivers often echo connection URLs back).
pub fn redact_secret(message: &str, secret: Option<&str>) -> String {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return message.to_string();
    };

    let mut redacted = message.replace(secret, REDACTED);

    let encoded: String = url::form_urlencoded::byte_serialize(secret.as_bytes()).collect();
    if encoded != secret {
        redacted = redacted.replace(&encoded, REDACTED);
        // form encoding writes spaces as '+', URLs usually carry %20
        let percent = encoded.replace('+', "%20");
        if percent != encoded {
            redacted = redacted.replace(&percent, REDACTED);
        }
    }

    redacted
}
