//! `MongoDB` adapter.
//!
//! Client options are built field by field instead of from a URI so the
//! password never exists inside a connection string.

use super::{ConnectionParameters, DatabaseAdapter, enumeration_error, report_unreachable};
use crate::{
    DiagnosticLogger, Result,
    models::{AdapterDescriptor, AdapterKind, EnumerationResult},
};
use async_trait::async_trait;
use mongodb::{
    Client,
    bson::{Bson, Document, doc},
    options::{ClientOptions, Credential, ServerAddress},
};
use serde::Serialize;

const DESCRIPTOR: AdapterDescriptor = AdapterDescriptor {
    key: "mongodb",
    name: "MongoDB",
    kind: AdapterKind::Document,
    default_port: 27017,
};

/// One collection reported in `collections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub database: String,
    pub name: String,
    pub document_count: Option<u64>,
    pub size_bytes: Option<u64>,
}

/// `MongoDB` adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDbAdapter;

fn client_options(params: &ConnectionParameters) -> ClientOptions {
    let mut options = ClientOptions::default();
    options.hosts = vec![ServerAddress::Tcp {
        host: params.host.clone(),
        port: Some(params.port),
    }];
    options.app_name = Some("dbenum".to_string());
    options.direct_connection = Some(true);
    options.connect_timeout = Some(params.connect_timeout);
    // The driver otherwise waits 30s for a server before failing
    options.server_selection_timeout = Some(params.connect_timeout);
    options.max_pool_size = Some(1);

    if params.user().is_some() || params.password().is_some() {
        let mut credential = Credential::default();
        credential.username = params.user().map(String::from);
        credential.password = params.password().map(String::from);
        credential.source = params.database().map(String::from);
        options.credential = Some(credential);
    }
    options
}

/// Reads a numeric field that may be stored as int32, int64 or double.
fn bson_u64(document: &Document, key: &str) -> Option<u64> {
    match document.get(key)? {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Bson::Double(v) if v.is_finite() && *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

type Catalog = (Option<String>, Vec<String>, Vec<CollectionInfo>);

/// Opens a client, reads the catalog and shuts the client down whether or
/// not the reads succeeded.
async fn collect(
    params: &ConnectionParameters,
    logger: &DiagnosticLogger,
) -> mongodb::error::Result<Catalog> {
    let client = Client::with_options(client_options(params))?;
    let catalog = read_catalog(&client, logger).await;
    client.shutdown().await;
    catalog
}

async fn read_catalog(client: &Client, logger: &DiagnosticLogger) -> mongodb::error::Result<Catalog> {
    logger.debug("Retrieving MongoDB version");
    let build_info = client
        .database("admin")
        .run_command(doc! { "buildInfo": 1 })
        .await?;
    let version = build_info.get_str("version").ok().map(String::from);

    logger.debug("Retrieving MongoDB databases");
    let databases = client.list_database_names().await?;

    let mut collections = Vec::new();
    for database in &databases {
        logger.debug(format!("Retrieving collections of {database}"));
        let db = client.database(database);
        let mut names = db
            .list_collection_names()
            .filter(doc! { "type": "collection" })
            .await?;
        names.sort();

        for name in names {
            let stats = db.run_command(doc! { "collStats": name.as_str() }).await?;
            collections.push(CollectionInfo {
                database: database.clone(),
                document_count: bson_u64(&stats, "count"),
                size_bytes: bson_u64(&stats, "size"),
                name,
            });
        }
    }

    Ok((version, databases, collections))
}

#[async_trait]
impl DatabaseAdapter for MongoDbAdapter {
    fn describe(&self) -> AdapterDescriptor {
        DESCRIPTOR
    }

    async fn check_connection(
        &self,
        params: &ConnectionParameters,
        logger: &DiagnosticLogger,
    ) -> bool {
        let attempt = async {
            let client = Client::with_options(client_options(params))?;
            let reply = client
                .database("admin")
                .run_command(doc! { "hello": 1 })
                .await;
            client.shutdown().await;
            reply
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
        let (version, databases, collections) = collect(params, logger)
            .await
            .map_err(|e| enumeration_error(&DESCRIPTOR, params, logger, e))?;

        EnumerationResult::new(&DESCRIPTOR, version)
            .with_section("databases", &databases)?
            .with_section("collections", &collections)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bson_numbers() {
        let stats = doc! { "count": 12_i32, "size": 4096_i64, "avgObjSize": 341.3, "neg": -1_i32 };
        assert_eq!(bson_u64(&stats, "count"), Some(12));
        assert_eq!(bson_u64(&stats, "size"), Some(4096));
        assert_eq!(bson_u64(&stats, "avgObjSize"), Some(341));
        assert_eq!(bson_u64(&stats, "neg"), None);
        assert_eq!(bson_u64(&stats, "missing"), None);
    }

    #[test]
    fn test_client_options_bounded_and_anonymous() {
        let params = ConnectionParameters::new("10.0.0.9", 27018)
            .with_connect_timeout(Duration::from_secs(2));
        let options = client_options(&params);

        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(2)));
        assert!(options.credential.is_none());
        assert_eq!(options.hosts.len(), 1);
    }

    #[test]
    fn test_client_options_auth_source_is_database() {
        let params = ConnectionParameters::new("localhost", 27017)
            .with_user("root")
            .with_password("pw")
            .with_database("admin");
        let credential = client_options(&params).credential.unwrap_or_default();
        assert_eq!(credential.username.as_deref(), Some("root"));
        assert_eq!(credential.source.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_collect_fails_within_timeout_when_server_absent() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let params = ConnectionParameters::new("127.0.0.1", port)
            .with_connect_timeout(Duration::from_secs(1));
        let logger = DiagnosticLogger::silent();

        // Server selection fails first; the client is still shut down
        let outcome = tokio::time::timeout(Duration::from_secs(10), collect(&params, &logger))
            .await
            .unwrap();
        assert!(outcome.is_err());
    }
}
