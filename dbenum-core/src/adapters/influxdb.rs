//! InfluxDB 1.x adapter over the HTTP API.

use super::http::{HttpError, RestTarget};
use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "influxdb",
    name: "InfluxDB",
    kind: AdapterKind::TimeSeries,
    default_port: 8086,
};

const VERSION_HEADER: &str = "X-Influxdb-Version";

/// Body of `/query`
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl QueryResponse {
    /// First column of every row, as strings.
    fn first_column(self) -> std::result::Result<Vec<String>, HttpError> {
        let mut names = Vec::new();
        for statement in self.results {
            if let Some(error) = statement.error {
                return Err(HttpError::Unexpected(error));
            }
            for series in statement.series {
                names.extend(series.values.into_iter().filter_map(|row| {
                    row.into_iter()
                        .next()
                        .and_then(|v| v.as_str().map(String::from))
                }));
            }
        }
        Ok(names)
    }
}

/// One measurement reported in `measurements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementInfo {
    pub database: String,
    pub name: String,
}

/// InfluxDB adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct InfluxDbAdapter;

/// `GET /ping`; the version header is what identifies the engine.
async fn ping(target: &RestTarget<'_>) -> std::result::Result<String, HttpError> {
    let response = target.get(target.url("ping")?).await?;
    response
        .headers()
        .get(VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .ok_or_else(|| HttpError::Unexpected(format!("/ping answered without {VERSION_HEADER}")))
}

async fn show(
    target: &RestTarget<'_>,
    statement: &str,
    database: Option<&str>,
) -> std::result::Result<Vec<String>, HttpError> {
    let mut url = target.url("query")?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", statement);
        if let Some(database) = database {
            pairs.append_pair("db", database);
        }
    }
    let response: QueryResponse = target.get(url).await?.json().await?;
    response.first_column()
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(String, Vec<String>, Vec<MeasurementInfo>), HttpError> {
    let target = RestTarget::new(params)?;

    logger.debug("Retrieving InfluxDB version");
    let version = ping(&target).await?;

    logger.debug("Retrieving InfluxDB databases");
    let databases = show(&target, "SHOW DATABASES", None).await?;

    let mut measurements = Vec::new();
    for database in &databases {
        logger.debug(format!("Retrieving measurements of {database}"));
        let names = show(&target, "SHOW MEASUREMENTS", Some(database)).await?;
        measurements.extend(names.into_iter().map(|name| MeasurementInfo {
            database: database.clone(),
            name,
        }));
    }

    Ok((version, databases, measurements))
}

#[async_trait]
impl DatabaseAdapter for InfluxDbAdapter {
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
            Ok::<_, HttpError>(ping(&target).await?)
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
        let (version, databases, measurements) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, Some(version))
            .with_section("databases", &databases)?
            .with_section("measurements", &measurements)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_show_databases_response() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"results":[{"statement_id":0,"series":[{"name":"databases",
                "columns":["name"],"values":[["_internal"],["telegraf"]]}]}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_column().unwrap(), ["_internal", "telegraf"]);
    }

    #[test]
    fn test_empty_series_yields_nothing() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"results":[{"statement_id":0}]}"#).unwrap();
        assert!(response.first_column().unwrap().is_empty());
    }

    #[test]
    fn test_statement_error_is_reported() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"results":[{"statement_id":0,"error":"database not found: x"}]}"#,
        )
        .unwrap();
        let error = response.first_column().unwrap_err();
        assert!(error.to_string().contains("database not found"));
    }
}
