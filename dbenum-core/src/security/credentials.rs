//! Secure credential container with automatic memory zeroing.
//!
//! This module provides the `Credentials` struct which stores the optional
//! user name and password of a target with automatic memory clearing on drop
//! using the `zeroize` crate.
//!
//! # Security
//! - Memory is cleared when credentials go out of scope
//! - Passwords are never exposed in debug output or logs

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secure credential container that automatically zeros memory on drop.
///
/// Both parts are optional: many exposed services (Redis, Elasticsearch,
/// CouchDB in admin-party mode) accept unauthenticated clients.
///
/// # Example
///
/// ```rust
/// use dbenum_core::security::Credentials;
///
/// let creds = Credentials::new(Some("admin".to_string()), Some("secret".to_string()));
/// assert_eq!(creds.username(), Some("admin"));
/// assert!(creds.has_password());
/// assert!(!format!("{creds:?}").contains("secret"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    /// Gets the user name, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Gets the password, if any.
    ///
    /// # Security
    /// Callers hand this straight to a driver; it must never be formatted
    /// into a log line or an error message.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_ref().map(|_| "<set>"))
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
