//! PostgreSQL adapter.
//!
//! Uses a single `sqlx` connection per call rather than a pool: each call
//! runs a handful of catalog queries and closes the connection before
//! returning.

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult, TableInfo},
};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use thiserror::Error;

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "postgres",
    name: "PostgreSQL",
    kind: AdapterKind::Sql,
    default_port: 5432,
};

/// Database connected to when none is given.
const DEFAULT_DATABASE: &str = "postgres";

const TABLES_QUERY: &str = "SELECT schemaname::text, relname::text, n_live_tup, \
                            pg_total_relation_size(relid) \
                            FROM pg_stat_user_tables \
                            ORDER BY schemaname, relname";

#[derive(Debug, Error)]
enum PgProbeError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error(transparent)]
    Driver(#[from] sqlx::Error),
}

/// PostgreSQL adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter;

fn connect_options(params: &ConnectionParameters) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .database(params.database().unwrap_or(DEFAULT_DATABASE))
        .application_name("dbenum")
        .disable_statement_logging();
    if let Some(user) = params.user() {
        options = options.username(user);
    }
    if let Some(password) = params.password() {
        options = options.password(password);
    }
    options
}

async fn connect(params: &ConnectionParameters) -> std::result::Result<PgConnection, PgProbeError> {
    tokio::time::timeout(params.connect_timeout, connect_options(params).connect())
        .await
        .map_err(|_| PgProbeError::Timeout)?
        .map_err(PgProbeError::from)
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(String, Vec<String>, Vec<TableInfo>), PgProbeError> {
    let mut conn = connect(params).await?;

    logger.debug("Retrieving PostgreSQL version");
    let version: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(&mut conn)
        .await?;

    logger.debug("Retrieving PostgreSQL databases");
    let databases: Vec<String> = sqlx::query_scalar(
        "SELECT datname::text FROM pg_database WHERE NOT datistemplate ORDER BY datname",
    )
    .fetch_all(&mut conn)
    .await?;

    logger.debug("Retrieving PostgreSQL table statistics");
    let rows: Vec<(String, String, Option<i64>, Option<i64>)> = sqlx::query_as(TABLES_QUERY)
        .fetch_all(&mut conn)
        .await?;

    conn.close().await?;

    let tables = rows
        .into_iter()
        .map(|(schema, name, approx_rows, size_bytes)| TableInfo {
            schema,
            name,
            approx_rows,
            size_bytes,
        })
        .collect();
    Ok((version, databases, tables))
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        let attempt = async {
            let mut conn = connect(params).await?;
            sqlx::query("SELECT 1").execute(&mut conn).await?;
            conn.close().await?;
            Ok::<_, PgProbeError>(())
        };
        match attempt.await {
            Ok(()) => true,
            Err(e) => report_unreachable(&DESCRIPTOR, params, logger, &e.to_string()),
        }
    }

    async fn enumerate(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> Result<EnumerationResult> {
        let (version, databases, tables) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, Some(version))
            .with_section("databases", &databases)?
            .with_section("tables", &tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_default_database() {
        let options = connect_options(&ConnectionParameters::new("db.local", 5433));
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some(DEFAULT_DATABASE));
    }

    #[test]
    fn test_connect_options_explicit_database_and_user() {
        let params = ConnectionParameters::new("db.local", 5432)
            .with_user("auditor")
            .with_database("app");
        let options = connect_options(&params);
        assert_eq!(options.get_database(), Some("app"));
        assert_eq!(options.get_username(), "auditor");
    }
}
