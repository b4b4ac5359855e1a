//! Static adapter registry.
//!
//! The registry is assembled once at process start from the engines compiled
//! into this build and never changes afterwards. Adapters are kept sorted by
//! key so that auto-detection probes them in the same order on every run.

use crate::{DatabaseAdapter, DbEnumError, Result, models::AdapterDescriptor};

/// Ordered, immutable set of adapters.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn DatabaseAdapter>>,
}

impl AdapterRegistry {
    /// Builds a registry from an explicit adapter list.
    ///
    /// # Errors
    /// Returns error if two adapters share a key
    pub fn new(mut adapters: Vec<Box<dyn DatabaseAdapter>>) -> Result<Self> {
        adapters.sort_by_key(|adapter| adapter.describe().key);

        let keys: Vec<&str> = adapters.iter().map(|adapter| adapter.describe().key).collect();
        if let Some(duplicate) = keys
            .iter()
            .zip(keys.iter().skip(1))
            .find_map(|(a, b)| (a == b).then_some(*a))
        {
            return Err(DbEnumError::configuration(format!(
                "adapter '{duplicate}' registered twice"
            )));
        }

        Ok(Self { adapters })
    }

    /// Returns a registry holding every engine compiled into this build.
    pub fn builtin() -> Self {
        let mut adapters: Vec<Box<dyn DatabaseAdapter>> = Vec::new();

        #[cfg(feature = "cassandra")]
        adapters.push(Box::new(crate::adapters::cassandra::CassandraAdapter));
        #[cfg(feature = "couchdb")]
        adapters.push(Box::new(crate::adapters::couchdb::CouchDbAdapter));
        #[cfg(feature = "elasticsearch")]
        adapters.push(Box::new(crate::adapters::elasticsearch::ElasticsearchAdapter));
        #[cfg(feature = "influxdb")]
        adapters.push(Box::new(crate::adapters::influxdb::InfluxDbAdapter));
        #[cfg(feature = "mongodb")]
        adapters.push(Box::new(crate::adapters::mongodb::MongoDbAdapter));
        #[cfg(feature = "mssql")]
        adapters.push(Box::new(crate::adapters::mssql::MssqlAdapter));
        #[cfg(feature = "mysql")]
        adapters.push(Box::new(crate::adapters::mysql::MySqlAdapter));
        #[cfg(feature = "neo4j")]
        adapters.push(Box::new(crate::adapters::neo4j::Neo4jAdapter));
        #[cfg(feature = "postgres")]
        adapters.push(Box::new(crate::adapters::postgres::PostgresAdapter));
        #[cfg(feature = "redis")]
        adapters.push(Box::new(crate::adapters::redis::RedisAdapter));

        // Keys are distinct literals, one per adapter module.
        adapters.sort_by_key(|adapter| adapter.describe().key);
        Self { adapters }
    }

    /// Returns every adapter in probing order.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &dyn DatabaseAdapter> {
        self.adapters.iter().map(AsRef::as_ref)
    }

    /// Looks up an adapter by key.
    ///
    /// # Errors
    /// Returns [`DbEnumError::AdapterNotFound`] if no adapter has that key
    pub fn by_name(&self, name: &str) -> Result<&dyn DatabaseAdapter> {
        self.all()
            .find(|adapter| adapter.describe().key == name)
            .ok_or_else(|| DbEnumError::adapter_not_found(name))
    }

    /// Returns the descriptors of every adapter in probing order.
    pub fn descriptors(&self) -> Vec<AdapterDescriptor> {
        self.all().map(|adapter| adapter.describe()).collect()
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns true when no adapter is registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.all().map(|adapter| adapter.describe().key))
            .finish()
    }
}
