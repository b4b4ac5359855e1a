//! Elasticsearch adapter over the REST API.
//!
//! Index listing comes from `_cat/indices` (one call for every index), doc
//! counts per copy from `{index}/_stats/docs`.

use super::http::{HttpError, RestTarget, segment};
use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "elasticsearch",
    name: "Elasticsearch",
    kind: AdapterKind::Document,
    default_port: 9200,
};

#[derive(Debug, Deserialize)]
struct ClusterInfo {
    version: VersionInfo,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    number: String,
}

/// One row of `_cat/indices?format=json`. Every value arrives as a string
/// and is null for closed indices.
#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
    health: Option<String>,
    status: Option<String>,
    pri: Option<String>,
    rep: Option<String>,
    #[serde(rename = "docs.count")]
    docs_count: Option<String>,
    #[serde(rename = "store.size")]
    store_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(rename = "_all")]
    all: StatsGroups,
}

#[derive(Debug, Deserialize)]
struct StatsGroups {
    primaries: DocStats,
    total: DocStats,
}

#[derive(Debug, Deserialize)]
struct DocStats {
    docs: Option<DocCount>,
}

#[derive(Debug, Deserialize)]
struct DocCount {
    count: u64,
}

/// Per-index summary reported in `indices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub doc_count: Option<u64>,
    pub size_bytes: Option<u64>,
    pub primary_shards: Option<u64>,
    pub replica_shards: Option<u64>,
    pub primary_docs: Option<u64>,
    pub total_docs: Option<u64>,
    pub health: Option<String>,
    pub status: Option<String>,
}

impl IndexInfo {
    fn new(cat: CatIndex, stats: Option<IndexStats>) -> Self {
        let number = |value: Option<String>| value.and_then(|v| v.parse::<u64>().ok());
        let (primary_docs, total_docs) = stats.map_or((None, None), |s| {
            (
                s.all.primaries.docs.map(|d| d.count),
                s.all.total.docs.map(|d| d.count),
            )
        });

        Self {
            name: cat.index,
            doc_count: number(cat.docs_count),
            size_bytes: number(cat.store_size),
            primary_shards: number(cat.pri),
            replica_shards: number(cat.rep),
            primary_docs,
            total_docs,
            health: cat.health,
            status: cat.status,
        }
    }
}

/// Elasticsearch adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchAdapter;

async fn cluster_version(target: &RestTarget<'_>) -> std::result::Result<String, HttpError> {
    let info: ClusterInfo = target.get_json("").await?;
    Ok(info.version.number)
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(String, Vec<IndexInfo>), HttpError> {
    let target = RestTarget::new(params)?;

    logger.debug("Retrieving Elasticsearch version");
    let version = cluster_version(&target).await?;

    logger.debug("Retrieving Elasticsearch indices");
    let cat: Vec<CatIndex> = target.get_json("_cat/indices?format=json&bytes=b").await?;

    let mut indices = Vec::with_capacity(cat.len());
    for entry in cat {
        // Closed indices reject _stats; keep them with the cat data only
        let stats = if entry.status.as_deref() == Some("close") {
            None
        } else {
            let path = format!("{}/_stats/docs", segment(&entry.index));
            Some(target.get_json::<IndexStats>(&path).await?)
        };
        indices.push(IndexInfo::new(entry, stats));
    }
    indices.sort_by(|a, b| a.name.cmp(&b.name));

    Ok((version, indices))
}

#[async_trait]
impl DatabaseAdapter for ElasticsearchAdapter {
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
            Ok::<_, HttpError>(cluster_version(&target).await?)
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
        let (version, indices) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, Some(version)).with_section("indices", &indices)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_index_info_from_cat_and_stats() {
        let cat: CatIndex = serde_json::from_str(
            r#"{"health":"yellow","status":"open","index":"logs","uuid":"x",
                "pri":"1","rep":"1","docs.count":"12","docs.deleted":"0",
                "store.size":"20480","pri.store.size":"20480"}"#,
        )
        .unwrap();
        let stats: IndexStats = serde_json::from_str(
            r#"{"_all":{"primaries":{"docs":{"count":12,"deleted":0}},
                        "total":{"docs":{"count":24,"deleted":0}}}}"#,
        )
        .unwrap();

        let info = IndexInfo::new(cat, Some(stats));
        assert_eq!(info.name, "logs");
        assert_eq!(info.doc_count, Some(12));
        assert_eq!(info.size_bytes, Some(20480));
        assert_eq!(info.primary_shards, Some(1));
        assert_eq!(info.replica_shards, Some(1));
        assert_eq!(info.primary_docs, Some(12));
        assert_eq!(info.total_docs, Some(24));
        assert_eq!(info.health.as_deref(), Some("yellow"));
    }

    #[test]
    fn test_closed_index_has_no_counts() {
        let cat: CatIndex = serde_json::from_str(
            r#"{"health":"red","status":"close","index":"old","pri":"1","rep":"0",
                "docs.count":null,"store.size":null}"#,
        )
        .unwrap();

        let info = IndexInfo::new(cat, None);
        assert_eq!(info.doc_count, None);
        assert_eq!(info.size_bytes, None);
        assert_eq!(info.total_docs, None);
        assert_eq!(info.status.as_deref(), Some("close"));
    }

    #[test]
    fn test_cluster_info_requires_version_number() {
        assert!(serde_json::from_str::<ClusterInfo>(r#"{"couchdb":"Welcome"}"#).is_err());
        let info: ClusterInfo =
            serde_json::from_str(r#"{"name":"n","version":{"number":"8.13.0"}}"#).unwrap();
        assert_eq!(info.version.number, "8.13.0");
    }
}
