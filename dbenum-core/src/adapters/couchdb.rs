//! CouchDB adapter over the HTTP API.

use super::http::{HttpError, RestTarget, segment};
use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult, coerce_to_string},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "couchdb",
    name: "CouchDB",
    kind: AdapterKind::Document,
    default_port: 5984,
};

/// Body of `GET /`
#[derive(Debug, Deserialize)]
struct Welcome {
    couchdb: String,
    version: Option<String>,
}

/// Body of `GET /{db}`
#[derive(Debug, Deserialize)]
struct RawDatabaseInfo {
    doc_count: Option<u64>,
    disk_size: Option<u64>,
    sizes: Option<Sizes>,
    update_seq: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Sizes {
    file: Option<u64>,
}

/// Per-database summary reported in `database_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub doc_count: Option<u64>,
    pub disk_size: Option<u64>,
    /// Opaque on CouchDB 2+, integer on 1.x; always reported as a string
    pub update_seq: Option<serde_json::Value>,
}

impl DatabaseInfo {
    fn from_raw(name: String, raw: RawDatabaseInfo) -> Self {
        // 3.x dropped the top-level disk_size in favour of sizes.file
        let disk_size = raw.disk_size.or_else(|| raw.sizes.and_then(|s| s.file));
        Self {
            name,
            doc_count: raw.doc_count,
            disk_size,
            update_seq: raw.update_seq.map(|seq| match seq {
                serde_json::Value::String(_) => seq,
                other => coerce_to_string(other),
            }),
        }
    }
}

/// CouchDB adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct CouchDbAdapter;

async fn welcome(target: &RestTarget<'_>) -> std::result::Result<Welcome, HttpError> {
    let welcome: Welcome = target.get_json("").await?;
    if welcome.couchdb.is_empty() {
        return Err(HttpError::Unexpected("empty couchdb banner".to_string()));
    }
    Ok(welcome)
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(Option<String>, Vec<String>, Vec<DatabaseInfo>), HttpError> {
    let target = RestTarget::new(params)?;

    logger.debug("Retrieving CouchDB version");
    let version = welcome(&target).await?.version;

    logger.debug("Retrieving CouchDB database list");
    let databases: Vec<String> = target.get_json("_all_dbs").await?;

    let mut info = Vec::with_capacity(databases.len());
    for name in &databases {
        let raw: RawDatabaseInfo = target.get_json(&segment(name)).await?;
        info.push(DatabaseInfo::from_raw(name.clone(), raw));
    }

    Ok((version, databases, info))
}

#[async_trait]
impl DatabaseAdapter for CouchDbAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        let attempt = async {
            let target = RestTarget::new(params)?;
            Ok::<_, HttpError>(welcome(&target).await?)
        };
        match attempt.await {
            Ok(_) => true,
            Err(e) => report_unreachable(&DESCRIPTOR, params, logger, &e.to_string()),
        }
    }

    async fn enumerate(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> Result<EnumerationResult> {
        let (version, databases, info) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, version)
            .with_section("databases", &databases)?
            .with_section("database_info", &info)
    }
}
