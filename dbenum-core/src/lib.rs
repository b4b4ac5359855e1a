//! Core adapter contract, detection engine and engine adapters for dbenum.
//!
//! This crate provides everything the `dbenum` binary needs to fingerprint an
//! exposed database service: a uniform three-operation adapter contract, a
//! static registry of engine adapters, a deadline-guarded invoker and the
//! auto-detection orchestrator that ties them together.
//!
//! # Security Guarantees
//! - Adapters are read-only: a ping/handshake to detect, catalog queries to enumerate
//! - Passwords are held in zeroizing containers and scrubbed from driver errors
//! - Diagnostic output identifies targets by `host:port` only
//!
//! # Architecture
//! - `adapters`: the `DatabaseAdapter` trait, `ConnectionParameters` and one
//!   feature-gated module per engine
//! - `registry`: ordered, immutable collection of adapters
//! - `detection`: per-attempt/global deadline composition and the probing loop
//! - `models`: descriptors and the serializable `EnumerationResult`

pub mod adapters;
pub mod detection;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;
pub mod security;

// Re-export commonly used types
pub use adapters::{ConnectionParameters, DatabaseAdapter};
pub use detection::{Detection, Detector, Outcome, ProbeBudget, invoke};
pub use error::{DbEnumError, Result};
pub use logging::DiagnosticLogger;
pub use models::{AdapterDescriptor, AdapterKind, EnumerationResult};
pub use registry::AdapterRegistry;
