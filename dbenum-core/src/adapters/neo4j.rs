//! Neo4j adapter over Bolt (neo4rs).

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult},
};
use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, query};
use thiserror::Error;

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "neo4j",
    name: "Neo4j",
    kind: AdapterKind::Graph,
    default_port: 7687,
};

/// Administration commands such as `SHOW DATABASES` only run here.
const SYSTEM_DATABASE: &str = "system";

#[derive(Debug, Error)]
enum BoltError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error(transparent)]
    Driver(#[from] neo4rs::Error),

    #[error("cannot decode column: {0}")]
    Decode(#[from] neo4rs::DeError),
}

/// Neo4j adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct Neo4jAdapter;

async fn connect(
    params: &ConnectionParameters,
    database: Option<&str>,
) -> std::result::Result<Graph, BoltError> {
    let mut config = ConfigBuilder::default()
        .uri(format!("bolt://{}:{}", params.url_host(), params.port))
        .user(params.user().unwrap_or_default())
        .password(params.password().unwrap_or_default())
        .max_connections(1);
    if let Some(database) = database.or_else(|| params.database()) {
        config = config.db(database);
    }
    let config = config.build()?;

    tokio::time::timeout(params.connect_timeout, Graph::connect(config))
        .await
        .map_err(|_| BoltError::Timeout)?
        .map_err(BoltError::from)
}

/// Runs `statement` and returns the string column `column` of every row.
async fn strings(
    graph: &Graph,
    statement: &str,
    column: &str,
) -> std::result::Result<Vec<String>, BoltError> {
    let mut stream = graph.execute(query(statement)).await?;
    let mut values = Vec::new();
    while let Some(row) = stream.next().await? {
        values.push(row.get::<String>(column)?);
    }
    Ok(values)
}

async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> std::result::Result<(Option<String>, Vec<String>, Vec<String>, Vec<String>), BoltError> {
    let graph = connect(params, None).await?;

    logger.debug("Retrieving Neo4j version");
    let version = strings(
        &graph,
        "CALL dbms.components() YIELD versions RETURN versions[0] AS version",
        "version",
    )
    .await?
    .into_iter()
    .next();

    logger.debug("Retrieving Neo4j node labels");
    let labels = strings(
        &graph,
        "CALL db.labels() YIELD label RETURN label ORDER BY label",
        "label",
    )
    .await?;

    logger.debug("Retrieving Neo4j relationship types");
    let relationship_types = strings(
        &graph,
        "CALL db.relationshipTypes() YIELD relationshipType \
         RETURN relationshipType ORDER BY relationshipType",
        "relationshipType",
    )
    .await?;
    drop(graph);

    logger.debug("Retrieving Neo4j databases");
    let system = connect(params, Some(SYSTEM_DATABASE)).await?;
    let mut databases = strings(&system, "SHOW DATABASES YIELD name RETURN DISTINCT name", "name").await?;
    databases.sort();

    Ok((version, databases, labels, relationship_types))
}

#[async_trait]
impl DatabaseAdapter for Neo4jAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        let attempt = async {
            let graph = connect(params, None).await?;
            graph.run(query("RETURN 1")).await?;
            Ok::<_, BoltError>(())
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
        let (version, databases, labels, relationship_types) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, version)
            .with_section("databases", &databases)?
            .with_section("node_labels", &labels)?
            .with_section("relationship_types", &relationship_types)
    }
}
