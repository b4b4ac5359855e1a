//! Redis adapter.
//!
//! Everything comes from `INFO`: the server section for the version, the
//! keyspace section for per-database key counts (databases with no keys are
//! absent from it) and the memory section for usage.

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult},
};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "redis",
    name: "Redis",
    kind: AdapterKind::KeyValue,
    default_port: 6379,
};

#[derive(Debug, Error)]
enum RedisProbeError {
    #[error("database must be a numeric index, got '{0}'")]
    DatabaseIndex(String),

    #[error("connection attempt timed out")]
    Timeout,

    #[error(transparent)]
    Driver(#[from] redis::RedisError),
}

/// Key statistics of one logical database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub database: String,
    pub key_count: u64,
    pub expires: u64,
    /// Server-wide `used_memory_human`
    pub memory_used: Option<String>,
}

/// Redis adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisAdapter;

fn connection_info(
    params: &ConnectionParameters,
) -> std::result::Result<redis::ConnectionInfo, RedisProbeError> {
    let db = match params.database() {
        Some(index) => index
            .parse::<i64>()
            .map_err(|_| RedisProbeError::DatabaseIndex(index.to_string()))?,
        None => 0,
    };

    Ok(redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(params.host.clone(), params.port),
        redis: redis::RedisConnectionInfo {
            db,
            username: params.user().map(String::from),
            password: params.password().map(String::from),
            ..Default::default()
        },
    })
}

async fn connect(
    params: &ConnectionParameters,
) -> std::result::Result<MultiplexedConnection, RedisProbeError> {
    let client = redis::Client::open(connection_info(params)?)?;
    tokio::time::timeout(
        params.connect_timeout,
        client.get_multiplexed_async_connection(),
    )
    .await
    .map_err(|_| RedisProbeError::Timeout)?
    .map_err(RedisProbeError::from)
}

async fn info_section(
    con: &mut MultiplexedConnection,
    section: &str,
) -> std::result::Result<BTreeMap<String, String>, RedisProbeError> {
    let raw: String = redis::cmd("INFO").arg(section).query_async(con).await?;
    Ok(parse_info(&raw))
}

/// Parses `INFO` output into `field -> value`, skipping `# Section` headers.
fn parse_info(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

/// Parses a keyspace line value such as `keys=12,expires=3,avg_ttl=0`.
fn parse_keyspace(value: &str) -> (u64, u64) {
    let mut keys = 0;
    let mut expires = 0;
    for (field, number) in value.split(',').filter_map(|pair| pair.split_once('=')) {
        match field {
            "keys" => keys = number.parse().unwrap_or(0),
            "expires" => expires = number.parse().unwrap_or(0),
            _ => {}
        }
    }
    (keys, expires)
}

/// Databases with a nonzero key count, ordered by index.
fn key_stats(keyspace: &BTreeMap<String, String>, memory_used: Option<&str>) -> Vec<KeyStats> {
    let mut stats: Vec<(u64, KeyStats)> = keyspace
        .iter()
        .filter_map(|(name, value)| {
            let index = name.strip_prefix("db")?.parse::<u64>().ok()?;
            let (key_count, expires) = parse_keyspace(value);
            (key_count > 0).then(|| {
                (
                    index,
                    KeyStats {
                        database: name.clone(),
                        key_count,
                        expires,
                        memory_used: memory_used.map(String::from),
                    },
                )
            })
        })
        .collect();
    stats.sort_by_key(|(index, _)| *index);
    stats.into_iter().map(|(_, s)| s).collect()
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(Option<String>, Vec<KeyStats>), RedisProbeError> {
    let mut con = connect(params).await?;

    logger.debug("Retrieving Redis version");
    let server = info_section(&mut con, "server").await?;

    logger.debug("Retrieving Redis keyspace");
    let keyspace = info_section(&mut con, "keyspace").await?;
    let memory = info_section(&mut con, "memory").await?;

    let stats = key_stats(
        &keyspace,
        memory.get("used_memory_human").map(String::as_str),
    );
    Ok((server.get("redis_version").cloned(), stats))
}

#[async_trait]
impl DatabaseAdapter for RedisAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        let attempt = async {
            let mut con = connect(params).await?;
            let pong: String = redis::cmd("PING").query_async(&mut con).await?;
            Ok::<_, RedisProbeError>(pong)
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
        let (version, stats) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;
        let databases: Vec<&str> = stats.iter().map(|s| s.database.as_str()).collect();

        EnumerationResult::new(&DESCRIPTOR, version)
            .with_section("databases", &databases)?
            .with_section("key_stats", &stats)
    }
}
