//! Security utilities for credential protection.
//!
//! This module provides:
//! - `Credentials`: zeroizing container for the optional user/password pair
//! - `scrub_secret`: removal of a password from driver-produced text
//!
//! # Security Guarantees
//! - Credentials are cleared from memory on drop
//! - Driver error messages are scrubbed before they reach a log line

mod credentials;

pub use credentials::Credentials;

/// Placeholder substituted for any secret removed from text.
pub const REDACTED: &str = "****";

/// Removes every occurrence of `secret` from `text`.
///
/// Driver error messages occasionally echo the connection URI they were
/// given. Besides the raw secret, both percent-encoded forms a driver may
/// have produced are replaced: URL userinfo encoding (`%20` for a space) and
/// form encoding (`+` for a space). Empty secrets leave the text unchanged.
///
/// # Example
/// ```rust
/// use dbenum_core::security::scrub_secret;
///
/// let scrubbed = scrub_secret("auth failed for redis://:hunter2@db:6379", Some("hunter2"));
/// assert_eq!(scrubbed, "auth failed for redis://:****@db:6379");
/// ```
pub fn scrub_secret(text: &str, secret: Option<&str>) -> String {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return text.to_string();
    };

    let mut scrubbed = text.replace(secret, REDACTED);
    for encoded in encoded_forms(secret) {
        if encoded != secret {
            scrubbed = scrubbed.replace(&encoded, REDACTED);
        }
    }
    scrubbed
}

/// The secret as it appears in a URL password and in a form-encoded query.
fn encoded_forms(secret: &str) -> Vec<String> {
    let mut forms = Vec::with_capacity(2);

    if let Ok(mut url) = url::Url::parse("scrub://user@localhost/")
        && url.set_password(Some(secret)).is_ok()
        && let Some(password) = url.password()
    {
        forms.push(password.to_string());
    }
    forms.push(url::form_urlencoded::byte_serialize(secret.as_bytes()).collect());
    forms
}
