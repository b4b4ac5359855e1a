//! Error types with credential-free messages.
//!
//! Every variant identifies a target by adapter name and `host:port` only.
//! Driver messages reach an error only as text, after the caller has scrubbed
//! any secret out of them (see [`crate::security::scrub_secret`]).

use std::time::Duration;
use thiserror::Error;

/// Main error type for dbenum operations.
///
/// # Security
/// No variant carries a password, a user name or a full connection URI.
#[derive(Debug, Error)]
pub enum DbEnumError {
    /// Invalid CLI input or adapter configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Requested adapter is not registered
    #[error("Unsupported database type: {name}")]
    AdapterNotFound { name: String },

    /// Single-target probe did not confirm connectivity
    #[error("Failed to connect to {adapter} database at {target}")]
    TargetUnreachable { adapter: String, target: String },

    /// A connected adapter failed while enumerating its catalog
    #[error("Enumeration of {adapter} failed: {context}")]
    Enumeration { adapter: String, context: String },

    /// Per-attempt deadline exceeded
    #[error("{adapter} probe of {target} timed out after {timeout:?}")]
    ProbeTimeout {
        adapter: String,
        target: String,
        timeout: Duration,
    },

    /// Cumulative deadline of the run exceeded
    #[error("Global timeout reached after probing {probed} adapter(s)")]
    GlobalTimeout { probed: usize },

    /// Every candidate adapter failed or was skipped
    #[error("No supported database type detected ({probed} adapter(s) probed)")]
    NoMatch { probed: usize },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results with DbEnumError
pub type Result<T> = std::result::Result<T, DbEnumError>;

impl DbEnumError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates the typed enumeration failure for an adapter.
    ///
    /// Adapters reach this through `adapters::enumeration_error`, which
    /// scrubs and logs the driver message first.
    pub fn enumeration_failed(adapter: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Enumeration {
            adapter: adapter.into(),
            context: context.into(),
        }
    }

    /// Creates an error for an unregistered adapter name
    pub fn adapter_not_found(name: impl Into<String>) -> Self {
        Self::AdapterNotFound { name: name.into() }
    }
}
