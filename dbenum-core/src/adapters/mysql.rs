//! MySQL adapter.
//!
//! `information_schema` columns come back with server-version-dependent
//! types (VARBINARY on some 8.0 builds, BIGINT UNSIGNED for counters), so
//! every catalog column is cast to CHAR or SIGNED before decoding.

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult, TableInfo},
};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use thiserror::Error;

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "mysql",
    name: "MySQL",
    kind: AdapterKind::Sql,
    default_port: 3306,
};

const TABLES_QUERY: &str = "SELECT CAST(TABLE_SCHEMA AS CHAR), CAST(TABLE_NAME AS CHAR), \
                            CAST(TABLE_ROWS AS SIGNED), CAST(DATA_LENGTH AS SIGNED) \
                            FROM information_schema.TABLES \
                            ORDER BY TABLE_SCHEMA, TABLE_NAME";

#[derive(Debug, Error)]
enum MySqlProbeError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error(transparent)]
    Driver(#[from] sqlx::Error),
}

/// MySQL adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlAdapter;

fn connect_options(params: &ConnectionParameters) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .disable_statement_logging();
    if let Some(user) = params.user() {
        options = options.username(user);
    }
    if let Some(password) = params.password() {
        options = options.password(password);
    }
    if let Some(database) = params.database() {
        options = options.database(database);
    }
    options
}

async fn connect(
    params: &ConnectionParameters,
) -> std::result::Result<MySqlConnection, MySqlProbeError> {
    tokio::time::timeout(params.connect_timeout, connect_options(params).connect())
        .await
        .map_err(|_| MySqlProbeError::Timeout)?
        .map_err(MySqlProbeError::from)
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(String, Vec<String>, Vec<TableInfo>), MySqlProbeError> {
    let mut conn = connect(params).await?;

    logger.debug("Retrieving MySQL version");
    let version: String = sqlx::query_scalar("SELECT CAST(VERSION() AS CHAR)")
        .fetch_one(&mut conn)
        .await?;

    logger.debug("Retrieving MySQL databases");
    let databases: Vec<String> = sqlx::query_scalar(
        "SELECT CAST(SCHEMA_NAME AS CHAR) FROM information_schema.SCHEMATA ORDER BY SCHEMA_NAME",
    )
    .fetch_all(&mut conn)
    .await?;

    logger.debug("Retrieving MySQL table statistics");
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
impl DatabaseAdapter for MySqlAdapter {
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
            Ok::<_, MySqlProbeError>(())
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
