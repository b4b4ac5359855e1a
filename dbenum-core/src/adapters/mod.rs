//! Database adapter trait and engine implementations.
//!
//! Every supported engine implements the same three operations against its
//! native client library:
//! - `describe`: static identity, no I/O
//! - `check_connection`: cheapest proof of live, authenticated connectivity
//! - `enumerate`: read-only retrieval of server version and catalog
//!
//! # Module Structure
//! - `config`: `ConnectionParameters` shared by every adapter
//! - `http`: reqwest client shared by the REST-speaking engines
//! - One feature-gated module per engine (cassandra, couchdb, ...)

use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, EnumerationResult},
};
use async_trait::async_trait;

pub mod config;

pub use config::ConnectionParameters;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "cassandra")]
pub mod cassandra;
#[cfg(feature = "couchdb")]
pub mod couchdb;
#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
#[cfg(feature = "influxdb")]
pub mod influxdb;
#[cfg(feature = "mongodb")]
pub mod mongodb;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "neo4j")]
pub mod neo4j;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;

/// Uniform contract implemented by every engine adapter.
///
/// # Security Guarantees
/// - `enumerate` is read-only: version and catalog queries only
/// - Credentials are never logged; driver errors are scrubbed first
/// - Each call opens and releases its own connection
///
/// # Object Safety
/// This trait is object-safe, allowing the registry to hold
/// `Box<dyn DatabaseAdapter>`.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Returns the adapter's static identity.
    fn describe(&self) -> AdapterDescriptor;

    /// Tests whether the target speaks this engine's protocol and accepts
    /// the given credentials.
    ///
    /// Never fails: network, auth and protocol errors are reported through
    /// `logger` and collapse to `false`.
    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool;

    /// Retrieves server version and catalog metadata.
    ///
    /// Assumes connectivity was already confirmed, but opens a fresh
    /// connection of its own.
    ///
    /// # Errors
    /// Returns [`crate::DbEnumError::Enumeration`] if any catalog query fails
    async fn enumerate(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> Result<EnumerationResult>;
}

/// Logs a failed connectivity check and returns `false`.
///
/// `reason` is scrubbed of the password before it is written.
pub(crate) fn report_unreachable(
    descriptor: &AdapterDescriptor,
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
    reason: &str,
) -> bool {
    logger.error(format!(
        "{} connection to {} failed: {}",
        descriptor.key,
        params.target(),
        params.scrub(reason)
    ));
    false
}

/// Converts a failure raised during enumeration into the typed error.
///
/// The driver message is scrubbed, logged and carried as context.
pub(crate) fn enumeration_error(
    descriptor: &AdapterDescriptor,
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
    error: impl std::fmt::Display,
) -> crate::DbEnumError {
    let context = params.scrub(&error.to_string());
    logger.error(format!(
        "{} enumeration of {} failed: {context}",
        descriptor.key,
        params.target()
    ));
    crate::DbEnumError::enumeration_failed(descriptor.key, context)
}
