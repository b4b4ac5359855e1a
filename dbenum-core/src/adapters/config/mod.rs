//! Configuration types for database adapters.
//!
//! - `ConnectionParameters`: target host, port, credentials and database
//!
//! # Security
//! Credentials live in a zeroizing container and never appear in `Display`
//! or `Debug` output.

mod connection;

pub use connection::ConnectionParameters;
