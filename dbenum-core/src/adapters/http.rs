//! HTTP plumbing shared by the REST-speaking engines.
//!
//! CouchDB, Elasticsearch and InfluxDB (1.x) are all queried over plain
//! JSON/HTTP. Credentials travel as a basic-auth header, never inside the
//! URL, so request errors (which echo the URL) stay credential-free.

use super::ConnectionParameters;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure of a REST call.
#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("invalid target URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// A target reachable over HTTP, bound to one set of connection parameters.
///
/// Each adapter call builds its own `RestTarget`; the underlying connection
/// pool is dropped with it.
pub(crate) struct RestTarget<'a> {
    client: reqwest::Client,
    base: url::Url,
    params: &'a ConnectionParameters,
}

impl<'a> RestTarget<'a> {
    /// Builds a client whose connect and request timeouts follow
    /// `params.connect_timeout`.
    pub(crate) fn new(params: &'a ConnectionParameters) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(params.connect_timeout)
            .timeout(params.connect_timeout)
            .user_agent(concat!("dbenum/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base = url::Url::parse(&format!("http://{}:{}/", params.url_host(), params.port))?;

        Ok(Self {
            client,
            base,
            params,
        })
    }

    /// Resolves `path` (which may carry a query string) against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<url::Url, HttpError> {
        Ok(self.base.join(path)?)
    }

    /// Sends a GET, attaching basic auth when a user is configured.
    pub(crate) async fn get(&self, url: url::Url) -> Result<reqwest::Response, HttpError> {
        let mut request = self.client.get(url);
        if let Some(user) = self.params.user() {
            request = request.basic_auth(user, self.params.password());
        }
        Ok(request.send().await?.error_for_status()?)
    }

    /// GETs `path` and decodes the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = self.url(path)?;
        Ok(self.get(url).await?.json::<T>().await?)
    }
}

/// Percent-encodes one URL path segment (database or index names).
pub(crate) fn segment(name: &str) -> String {
    url::form_urlencoded::byte_serialize(name.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
