//! Target connection parameters.
//!
//! This module provides the `ConnectionParameters` struct built once from CLI
//! input and lent, immutably, to every adapter call.

use crate::security::{Credentials, scrub_secret};
use std::time::Duration;

/// Where and as whom to connect.
///
/// # Security
/// The password lives inside a zeroizing [`Credentials`] container. Neither
/// `Display` nor `Debug` print credentials: targets are rendered as
/// `host:port` only.
///
/// # Example
/// ```rust
/// use dbenum_core::adapters::ConnectionParameters;
///
/// let params = ConnectionParameters::new("db.internal", 5432)
///     .with_user("admin")
///     .with_password("secret")
///     .with_database("postgres");
///
/// assert!(params.validate().is_ok());
/// assert_eq!(params.to_string(), "db.internal:5432");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    /// Target host name or address
    pub host: String,
    /// Target port
    pub port: u16,
    /// Optional database, keyspace or index number (engine-specific)
    pub database: Option<String>,
    /// Driver-level connect timeout hint for clients that support one
    pub connect_timeout: Duration,
    credentials: Credentials,
}

impl ConnectionParameters {
    /// Creates anonymous connection parameters with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            database: None,
            connect_timeout: Duration::from_secs(15),
            credentials: Credentials::default(),
        }
    }

    /// Builder method to set the user name.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.credentials = Credentials::new(Some(user.into()), self.password().map(String::from));
        self
    }

    /// Builder method to set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials = Credentials::new(self.user().map(String::from), Some(password.into()));
        self
    }

    /// Builder method to set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Builder method to set the driver connect timeout hint.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Gets the user name, if any.
    pub fn user(&self) -> Option<&str> {
        self.credentials.username()
    }

    /// Gets the password, if any. Never log the returned value.
    pub fn password(&self) -> Option<&str> {
        self.credentials.password()
    }

    /// Gets the database name, if any.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns the `host:port` pair used in every diagnostic line.
    pub fn target(&self) -> String {
        self.to_string()
    }

    /// Host formatted for use inside a URL authority (IPv6 gets brackets).
    pub fn url_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// Removes the password from driver-produced text before it is logged.
    pub fn scrub(&self, text: &str) -> String {
        scrub_secret(text, self.password())
    }

    /// Validates connection parameters.
    ///
    /// # Errors
    /// Returns error if the host is empty, the port is zero, or the connect
    /// timeout is zero
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::error::DbEnumError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::DbEnumError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::DbEnumError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
        // Intentionally omit user, password and database
    }
}

impl std::fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("credentials", &self.credentials)
            .finish()
    }
}
