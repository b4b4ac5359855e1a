//! Microsoft SQL Server adapter over TDS (tiberius).
//!
//! # Security
//! Exposed SQL Server instances almost always present a self-signed
//! certificate, so the server certificate is trusted without validation.
//! The connection is still encrypted when the server offers it.

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult, TableInfo},
};
use async_trait::async_trait;
use thiserror::Error;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "mssql",
    name: "Microsoft SQL Server",
    kind: AdapterKind::Sql,
    default_port: 1433,
};

/// Row count and allocated size per table of the current database.
const TABLES_QUERY: &str = "SELECT s.name AS schema_name, t.name AS table_name, \
                                   CAST(SUM(p.rows) AS BIGINT) AS row_count, \
                                   CAST(SUM(a.total_pages) * 8 * 1024 AS BIGINT) AS total_bytes \
                            FROM sys.tables t \
                            INNER JOIN sys.indexes i ON t.object_id = i.object_id \
                            INNER JOIN sys.partitions p ON i.object_id = p.object_id AND i.index_id = p.index_id \
                            INNER JOIN sys.allocation_units a ON p.partition_id = a.container_id \
                            LEFT JOIN sys.schemas s ON t.schema_id = s.schema_id \
                            WHERE i.index_id <= 1 \
                            GROUP BY s.name, t.name \
                            ORDER BY s.name, t.name";

type TdsClient = Client<Compat<TcpStream>>;

#[derive(Debug, Error)]
enum MssqlProbeError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error("TCP connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Driver(#[from] tiberius::error::Error),

    #[error("unexpected response: {0}")]
    Unexpected(&'static str),
}

/// SQL Server adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlAdapter;

fn tds_config(params: &ConnectionParameters) -> Config {
    let mut config = Config::new();
    config.host(&params.host);
    config.port(params.port);
    config.authentication(AuthMethod::sql_server(
        params.user().unwrap_or_default(),
        params.password().unwrap_or_default(),
    ));
    if let Some(database) = params.database() {
        config.database(database);
    }
    config.application_name("dbenum");
    config.trust_cert();
    config
}

async fn connect(params: &ConnectionParameters) -> std::result::Result<TdsClient, MssqlProbeError> {
    let config = tds_config(params);
    let login = async {
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Ok::<_, MssqlProbeError>(Client::connect(config.clone(), tcp.compat_write()).await?)
    };

    // Tiberius has no connect timeout of its own
    tokio::time::timeout(params.connect_timeout, login)
        .await
        .map_err(|_| MssqlProbeError::Timeout)?
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(String, Vec<String>, Vec<TableInfo>), MssqlProbeError> {
    let mut client = connect(params).await?;

    logger.debug("Retrieving SQL Server version");
    let version = client
        .simple_query("SELECT @@VERSION")
        .await?
        .into_row()
        .await?
        .and_then(|row| row.try_get::<&str, _>(0).ok().flatten().map(String::from))
        .ok_or(MssqlProbeError::Unexpected("@@VERSION returned no row"))?;

    logger.debug("Retrieving SQL Server databases");
    let databases = client
        .simple_query("SELECT name FROM sys.databases ORDER BY name")
        .await?
        .into_first_result()
        .await?
        .iter()
        .map(|row| row.try_get::<&str, _>(0).map(|name| name.map(String::from)))
        .filter_map(std::result::Result::transpose)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    logger.debug("Retrieving SQL Server table statistics");
    let rows = client
        .simple_query(TABLES_QUERY)
        .await?
        .into_first_result()
        .await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in &rows {
        tables.push(TableInfo {
            schema: row
                .try_get::<&str, _>("schema_name")?
                .unwrap_or_default()
                .to_string(),
            name: row
                .try_get::<&str, _>("table_name")?
                .unwrap_or_default()
                .to_string(),
            approx_rows: row.try_get::<i64, _>("row_count")?,
            size_bytes: row.try_get::<i64, _>("total_bytes")?,
        });
    }

    client.close().await?;
    Ok((version, databases, tables))
}

#[async_trait]
impl DatabaseAdapter for MssqlAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        let attempt = async {
            let mut client = connect(params).await?;
            client.simple_query("SELECT 1").await?.into_results().await?;
            client.close().await?;
            Ok::<_, MssqlProbeError>(())
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
    fn test_tds_config_address() {
        let params = ConnectionParameters::new("10.1.2.3", 14330).with_user("sa");
        assert_eq!(tds_config(&params).get_addr(), "10.1.2.3:14330");
    }
}
