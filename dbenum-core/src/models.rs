//! Core data models for adapter descriptors and enumeration results.
//!
//! `EnumerationResult` is the single document a run emits. Its fixed part
//! (`type`, `kind`, `version`, `enumerated_at`) is shared by every engine;
//! engine-specific collections are attached as named sections and flattened
//! into the same JSON object on output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Family of database engine an adapter speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    Sql,
    Document,
    KeyValue,
    WideColumn,
    Graph,
    TimeSeries,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKind::Sql => write!(f, "sql"),
            AdapterKind::Document => write!(f, "document"),
            AdapterKind::KeyValue => write!(f, "key-value"),
            AdapterKind::WideColumn => write!(f, "wide-column"),
            AdapterKind::Graph => write!(f, "graph"),
            AdapterKind::TimeSeries => write!(f, "time-series"),
        }
    }
}

/// Static description of an adapter.
///
/// `key` is the registry name and CLI subcommand (`mssql`); `name` is the
/// human-readable engine name reported as `type` in results
/// (`Microsoft SQL Server`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdapterDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub kind: AdapterKind,
    pub default_port: u16,
}

/// Structured summary of one engine's version and catalog.
///
/// # Example
/// ```rust
/// use dbenum_core::models::{AdapterDescriptor, AdapterKind, EnumerationResult};
///
/// let descriptor = AdapterDescriptor {
///     key: "redis",
///     name: "Redis",
///     kind: AdapterKind::KeyValue,
///     default_port: 6379,
/// };
/// let result = EnumerationResult::new(&descriptor, Some("7.2.4".to_string()))
///     .with_section("databases", &["db0"])
///     .unwrap();
///
/// let json = serde_json::to_value(&result).unwrap();
/// assert_eq!(json["type"], "Redis");
/// assert_eq!(json["kind"], "key-value");
/// assert_eq!(json["databases"][0], "db0");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumerationResult {
    #[serde(rename = "type")]
    pub engine: String,
    pub kind: AdapterKind,
    pub version: Option<String>,
    pub enumerated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, serde_json::Value>,
}

impl EnumerationResult {
    /// Creates an empty result tagged with the adapter's descriptor.
    pub fn new(descriptor: &AdapterDescriptor, version: Option<String>) -> Self {
        Self {
            engine: descriptor.name.to_string(),
            kind: descriptor.kind,
            version,
            enumerated_at: Utc::now(),
            sections: BTreeMap::new(),
        }
    }

    /// Attaches an engine-specific collection under `name`.
    ///
    /// # Errors
    /// Returns error if `value` cannot be represented as JSON
    pub fn with_section<T>(mut self, name: &str, value: &T) -> crate::Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(|e| {
            crate::error::DbEnumError::Serialization {
                context: format!("Failed to serialize section '{name}'"),
                source: e,
            }
        })?;
        self.sections.insert(name.to_string(), value);
        Ok(self)
    }

    /// Renders the result as indented JSON.
    ///
    /// Timestamps are encoded as RFC 3339 (ISO-8601) strings; engine values
    /// without a JSON counterpart are coerced to strings by the adapters
    /// before they reach a section.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::error::DbEnumError::Serialization {
            context: "Failed to serialize enumeration result".to_string(),
            source: e,
        })
    }
}

/// One table-like object with optional size metadata.
///
/// Shared by the SQL engines, whose catalogs expose the same four facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub approx_rows: Option<i64>,
    pub size_bytes: Option<i64>,
}

/// Converts a value without a JSON counterpart into its string form.
pub fn coerce_to_string<T: std::fmt::Display>(value: T) -> serde_json::Value {
    serde_json::Value::String(value.to_string())
}
