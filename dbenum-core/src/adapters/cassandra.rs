//! Cassandra adapter over CQL (scylla driver).
//!
//! The schema tables in `system_schema` are readable by any authenticated
//! role, so a single query per object kind covers the whole cluster.

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult},
};
use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use serde::Serialize;
use thiserror::Error;

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "cassandra",
    name: "Cassandra",
    kind: AdapterKind::WideColumn,
    default_port: 9042,
};

#[derive(Debug, Error)]
enum CqlError {
    #[error("session setup timed out")]
    Timeout,

    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),
}

fn driver<E>(error: E) -> CqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CqlError::Driver(Box::new(error))
}

/// One table reported in `tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CqlTable {
    pub keyspace: String,
    pub name: String,
}

/// Cassandra adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct CassandraAdapter;

/// Session settings for `params`.
///
/// No keyspace is selected: every query reads the cluster-wide
/// `system_schema`, and `--database` naming a missing keyspace must not turn
/// a reachable server into an unreachable one.
fn session_builder(params: &ConnectionParameters) -> SessionBuilder {
    let builder = SessionBuilder::new()
        .known_node(format!("{}:{}", params.url_host(), params.port))
        .connection_timeout(params.connect_timeout);
    match params.user() {
        Some(user) => builder.user(user, params.password().unwrap_or_default()),
        None => builder,
    }
}

async fn connect(params: &ConnectionParameters) -> std::result::Result<Session, CqlError> {
    // Metadata fetch after the handshake is not covered by connection_timeout
    tokio::time::timeout(params.connect_timeout, session_builder(params).build())
        .await
        .map_err(|_| CqlError::Timeout)?
        .map_err(driver)
}

async fn single_column(session: &Session, query: &str) -> std::result::Result<Vec<String>, CqlError> {
    let rows = session
        .query_unpaged(query, &[])
        .await
        .map_err(driver)?
        .into_rows_result()
        .map_err(driver)?;
    rows.rows::<(String,)>()
        .map_err(driver)?
        .map(|row| row.map(|(value,)| value).map_err(driver))
        .collect()
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(Option<String>, Vec<String>, Vec<CqlTable>), CqlError> {
    let session = connect(params).await?;

    logger.debug("Retrieving Cassandra version");
    let version = single_column(&session, "SELECT release_version FROM system.local")
        .await?
        .into_iter()
        .next();

    logger.debug("Retrieving Cassandra keyspaces");
    let mut keyspaces =
        single_column(&session, "SELECT keyspace_name FROM system_schema.keyspaces").await?;
    keyspaces.sort();

    logger.debug("Retrieving Cassandra tables");
    let rows = session
        .query_unpaged("SELECT keyspace_name, table_name FROM system_schema.tables", &[])
        .await
        .map_err(driver)?
        .into_rows_result()
        .map_err(driver)?;
    let mut tables = rows
        .rows::<(String, String)>()
        .map_err(driver)?
        .map(|row| {
            row.map(|(keyspace, name)| CqlTable { keyspace, name })
                .map_err(driver)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    tables.sort_by(|a, b| (&a.keyspace, &a.name).cmp(&(&b.keyspace, &b.name)));

    Ok((version, keyspaces, tables))
}

#[async_trait]
impl DatabaseAdapter for CassandraAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        match connect(params).await {
            Ok(_session) => true,
            Err(e) => report_unreachable(&DESCRIPTOR, params, logger, &e.to_string()),
        }
    }

    async fn enumerate(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> Result<EnumerationResult> {
        let (version, keyspaces, tables) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, version)
            .with_section("keyspaces", &keyspaces)?
            .with_section("tables", &tables)
    }
}
