//! REST adapters (CouchDB, Elasticsearch, InfluxDB) against a local HTTP
//! server that answers fixed routes with canned responses.

#![cfg(any(feature = "couchdb", feature = "elasticsearch", feature = "influxdb"))]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use dbenum_core::{ConnectionParameters, DatabaseAdapter, DiagnosticLogger};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SENSITIVE_PASSWORD: &str = "rest-test-secret-41d0";

/// One canned HTTP response.
#[derive(Clone)]
struct Reply {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: String,
}

impl Reply {
    fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            headers: Vec::new(),
            body: json!({"error": "not_found"}).to_string(),
        }
    }

    fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    fn render(&self) -> String {
        let reason = match self.status {
            200 => "OK",
            204 => "No Content",
            _ => "Not Found",
        };
        let mut out = format!("HTTP/1.1 {} {reason}\r\n", self.status);
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        if self.status != 204 {
            out.push_str("Content-Type: application/json\r\n");
            out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        out.push_str("Connection: close\r\n\r\n");
        out.push_str(&self.body);
        out
    }
}

/// HTTP server answering exact request targets (`/path?query`), 404 otherwise.
struct CannedServer {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    async fn start(routes: Vec<(&'static str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes: Arc<HashMap<&'static str, Reply>> = Arc::new(routes.into_iter().collect());

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &log).await;
                });
            }
        });

        Self { port, requests }
    }

    fn params(&self) -> ConnectionParameters {
        ConnectionParameters::new("127.0.0.1", self.port).with_connect_timeout(Duration::from_secs(5))
    }

    /// Raw request heads in arrival order.
    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Request targets (`/path?query`) in arrival order.
    fn targets(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|head| head.split_whitespace().nth(1).unwrap_or_default().to_string())
            .collect()
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<&'static str, Reply>,
    log: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0_u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
    log.lock().unwrap().push(head);

    let reply = routes
        .get(target.as_str())
        .cloned()
        .unwrap_or_else(Reply::not_found);
    stream.write_all(reply.render().as_bytes()).await?;
    stream.shutdown().await
}

fn couchdb_banner() -> Reply {
    Reply::json(json!({"couchdb": "Welcome", "version": "3.3.3", "vendor": {"name": "The Apache Software Foundation"}}))
}

fn elasticsearch_banner() -> Reply {
    Reply::json(json!({
        "name": "node-1",
        "cluster_name": "docker-cluster",
        "version": {"number": "8.13.0"},
        "tagline": "You Know, for Search"
    }))
}

fn influx_rows(rows: &[&str]) -> Reply {
    let values: Vec<_> = rows.iter().map(|r| json!([r])).collect();
    Reply::json(json!({
        "results": [{"statement_id": 0, "series": [{"name": "n", "columns": ["name"], "values": values}]}]
    }))
}

#[cfg(feature = "couchdb")]
mod couchdb_rest {
    use super::*;
    use dbenum_core::adapters::couchdb::CouchDbAdapter;

    fn routes() -> Vec<(&'static str, Reply)> {
        vec![
            ("/", couchdb_banner()),
            ("/_all_dbs", Reply::json(json!(["_users", "inventory"]))),
            (
                "/_users",
                Reply::json(json!({"doc_count": 1, "sizes": {"file": 2048}, "update_seq": "1-g1AAAA"})),
            ),
            (
                "/inventory",
                Reply::json(json!({"doc_count": 3, "disk_size": 4096, "update_seq": 7})),
            ),
        ]
    }

    #[tokio::test]
    async fn test_couchdb_check_connection_accepts_banner() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();
        assert!(CouchDbAdapter.check_connection(&server.params(), &logger).await);
    }

    #[tokio::test]
    async fn test_couchdb_check_connection_rejects_other_engine() {
        let server = CannedServer::start(vec![("/", elasticsearch_banner())]).await;
        let logger = DiagnosticLogger::silent();
        assert!(!CouchDbAdapter.check_connection(&server.params(), &logger).await);
    }

    #[tokio::test]
    async fn test_couchdb_enumerate_sections() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();

        let result = CouchDbAdapter.enumerate(&server.params(), &logger).await.unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["type"], "CouchDB");
        assert_eq!(json["version"], "3.3.3");
        assert_eq!(json["databases"], json!(["_users", "inventory"]));
        assert_eq!(json["database_info"][0]["disk_size"], 2048);
        assert_eq!(json["database_info"][1]["doc_count"], 3);
        assert_eq!(json["database_info"][1]["update_seq"], "7");
    }

    #[tokio::test]
    async fn test_credential_sent_as_basic_auth_header() {
        let server = CannedServer::start(routes()).await;
        let params = server
            .params()
            .with_user("admin")
            .with_password(SENSITIVE_PASSWORD);
        let logger = DiagnosticLogger::silent();

        CouchDbAdapter.enumerate(&params, &logger).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 4);
        for head in &requests {
            let request_line = head.lines().next().unwrap();
            assert!(!request_line.contains("admin"), "{request_line}");
            assert!(!request_line.contains(SENSITIVE_PASSWORD), "{request_line}");
            assert!(
                head.to_ascii_lowercase().contains("\r\nauthorization: basic "),
                "missing basic auth in {head}"
            );
            assert!(!head.contains(SENSITIVE_PASSWORD));
        }
    }

    #[tokio::test]
    async fn test_anonymous_requests_carry_no_authorization() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();

        assert!(CouchDbAdapter.check_connection(&server.params(), &logger).await);

        let head = server.requests().remove(0);
        assert!(!head.to_ascii_lowercase().contains("authorization:"));
    }
}

#[cfg(feature = "elasticsearch")]
mod elasticsearch_rest {
    use super::*;
    use dbenum_core::adapters::elasticsearch::ElasticsearchAdapter;

    fn routes() -> Vec<(&'static str, Reply)> {
        vec![
            ("/", elasticsearch_banner()),
            (
                "/_cat/indices?format=json&bytes=b",
                Reply::json(json!([
                    {"health": "yellow", "status": "open", "index": "logs", "pri": "1",
                     "rep": "1", "docs.count": "5", "store.size": "8192"},
                    {"health": null, "status": "close", "index": "archive", "pri": "1",
                     "rep": "0", "docs.count": null, "store.size": null}
                ])),
            ),
            (
                "/logs/_stats/docs",
                Reply::json(json!({
                    "_all": {
                        "primaries": {"docs": {"count": 5, "deleted": 0}},
                        "total": {"docs": {"count": 10, "deleted": 0}}
                    }
                })),
            ),
        ]
    }

    #[tokio::test]
    async fn test_elasticsearch_check_connection_accepts_banner() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();
        assert!(ElasticsearchAdapter.check_connection(&server.params(), &logger).await);
    }

    #[tokio::test]
    async fn test_elasticsearch_check_connection_rejects_other_engine() {
        let server = CannedServer::start(vec![("/", couchdb_banner())]).await;
        let (logger, buffer) = DiagnosticLogger::capturing(1);

        assert!(!ElasticsearchAdapter.check_connection(&server.params(), &logger).await);
        assert!(buffer.contents().contains("elasticsearch connection to 127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_elasticsearch_closed_index_skips_stats() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();

        let result = ElasticsearchAdapter
            .enumerate(&server.params(), &logger)
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["version"], "8.13.0");
        let indices = json["indices"].as_array().unwrap();
        assert_eq!(indices.len(), 2);

        assert_eq!(indices[0]["name"], "archive");
        assert_eq!(indices[0]["status"], "close");
        assert!(indices[0]["primary_docs"].is_null());
        assert!(indices[0]["doc_count"].is_null());

        assert_eq!(indices[1]["name"], "logs");
        assert_eq!(indices[1]["size_bytes"], 8192);
        assert_eq!(indices[1]["primary_docs"], 5);
        assert_eq!(indices[1]["total_docs"], 10);

        let targets = server.targets();
        assert!(targets.contains(&"/logs/_stats/docs".to_string()));
        assert!(!targets.iter().any(|t| t.starts_with("/archive")));
    }
}

#[cfg(feature = "influxdb")]
mod influxdb_rest {
    use super::*;
    use dbenum_core::adapters::influxdb::InfluxDbAdapter;

    fn routes() -> Vec<(&'static str, Reply)> {
        vec![
            (
                "/ping",
                Reply::no_content().with_header("X-Influxdb-Version", "1.8.10"),
            ),
            ("/query?q=SHOW+DATABASES", influx_rows(&["_internal", "telegraf"])),
            ("/query?q=SHOW+MEASUREMENTS&db=_internal", influx_rows(&["runtime"])),
            ("/query?q=SHOW+MEASUREMENTS&db=telegraf", influx_rows(&["cpu", "mem"])),
        ]
    }

    #[tokio::test]
    async fn test_influxdb_check_connection_requires_version_header() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();
        assert!(InfluxDbAdapter.check_connection(&server.params(), &logger).await);

        let headerless = CannedServer::start(vec![("/ping", Reply::no_content())]).await;
        let (logger, buffer) = DiagnosticLogger::capturing(1);
        assert!(!InfluxDbAdapter.check_connection(&headerless.params(), &logger).await);
        assert!(buffer.contents().contains("X-Influxdb-Version"));
    }

    #[tokio::test]
    async fn test_influxdb_check_connection_rejects_missing_ping() {
        let server = CannedServer::start(vec![("/", elasticsearch_banner())]).await;
        let logger = DiagnosticLogger::silent();
        assert!(!InfluxDbAdapter.check_connection(&server.params(), &logger).await);
    }

    #[tokio::test]
    async fn test_influxdb_enumerate_sections() {
        let server = CannedServer::start(routes()).await;
        let logger = DiagnosticLogger::silent();

        let result = InfluxDbAdapter.enumerate(&server.params(), &logger).await.unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["type"], "InfluxDB");
        assert_eq!(json["kind"], "time-series");
        assert_eq!(json["version"], "1.8.10");
        assert_eq!(json["databases"], json!(["_internal", "telegraf"]));
        assert_eq!(
            json["measurements"],
            json!([
                {"database": "_internal", "name": "runtime"},
                {"database": "telegraf", "name": "cpu"},
                {"database": "telegraf", "name": "mem"}
            ])
        );
    }
}
