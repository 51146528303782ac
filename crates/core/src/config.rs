//! Driver configuration
//!
//! Recognized options and their defaults mirror the driver contract:
//! `host` ("localhost"), `port` (27017), `database` ("default"),
//! `cache_prefix` (none), `storage` (none; caching disabled), plus the
//! pre-flight probe timeout.

use crate::traits::CacheStorage;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one driver instance
///
/// `storage` selects the cache backend: a resolved backend instance
/// enables caching, absence disables it entirely. Resolving a backend by
/// name is an external-collaborator concern; the driver only accepts the
/// resolved instance.
#[derive(Clone)]
pub struct DriverConfig {
    /// Store host
    pub host: String,
    /// Store port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Optional namespace prefix for cache keys
    pub cache_prefix: Option<String>,
    /// Cache backend; None disables caching
    pub storage: Option<Arc<dyn CacheStorage>>,
    /// Timeout for the pre-flight reachability probe
    pub connect_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            host: "localhost".to_string(),
            port: 27017,
            database: "default".to_string(),
            cache_prefix: None,
            storage: None,
            connect_timeout: Duration::from_secs(4),
        }
    }
}

impl DriverConfig {
    /// Configuration for the given host, port, and database
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        DriverConfig {
            host: host.into(),
            port,
            database: database.into(),
            ..Default::default()
        }
    }

    /// Enable caching with the given backend
    pub fn with_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Namespace cache keys with the given prefix
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = Some(prefix.into());
        self
    }

    /// Override the pre-flight probe timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("cache_prefix", &self.cache_prefix)
            .field("storage", &self.storage.as_ref().map(|_| "<backend>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
