use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::core::{EventCacheError, Result};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: Server,
    pub cache_store: CacheStoreConfig,
    pub document_store: DocumentStoreConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Outer deadline for a single `/event` lookup
    pub lookup_timeout_ms: u64,
    /// How often the connection monitor pings both stores
    pub health_probe_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStoreConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ttl_secs: u64,
    pub op_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Field holding the external event identifier
    pub id_field: String,
    pub op_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Count `STORE_ERROR` outcomes toward the miss counter
    pub count_errors_as_misses: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            count_errors_as_misses: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: Server {
                host: "0.0.0.0".to_string(),
                port: 3001,
                lookup_timeout_ms: 5000,
                health_probe_interval_ms: 5000,
            },
            cache_store: CacheStoreConfig {
                host: "localhost".to_string(),
                port: 6379,
                username: None,
                password: None,
                ttl_secs: 60,
                op_timeout_ms: 2000,
            },
            document_store: DocumentStoreConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "Waze".to_string(),
                collection: "Events".to_string(),
                id_field: "uuid".to_string(),
                op_timeout_ms: 2000,
            },
            stats: StatsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    ///
    /// Unset or empty variables leave the current value in place; values that
    /// fail to parse are rejected.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(ms) = get("LOOKUP_TIMEOUT_MS") {
            self.server.lookup_timeout_ms = parse_var("LOOKUP_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = get("HEALTH_PROBE_INTERVAL_MS") {
            self.server.health_probe_interval_ms = parse_var("HEALTH_PROBE_INTERVAL_MS", &ms)?;
        }

        if let Some(host) = get("REDIS_HOST") {
            self.cache_store.host = host;
        }
        if let Some(port) = get("REDIS_PORT") {
            self.cache_store.port = parse_var("REDIS_PORT", &port)?;
        }
        if let Some(username) = get("REDIS_USERNAME") {
            self.cache_store.username = Some(username);
        }
        if let Some(password) = get("REDIS_PASSWORD") {
            self.cache_store.password = Some(password);
        }
        if let Some(ttl) = get("CACHE_TTL_SECONDS") {
            self.cache_store.ttl_secs = parse_var("CACHE_TTL_SECONDS", &ttl)?;
        }

        if let Some(uri) = get("MONGO_CONNECTION").or_else(|| get("MONGO_CONECTION")) {
            self.document_store.uri = uri;
        }
        if let Some(database) = get("MONGO_DB_NAME") {
            self.document_store.database = database;
        }
        if let Some(collection) = get("MONGO_COLLECTION_NAME") {
            self.document_store.collection = collection;
        }

        if let Some(flag) = get("STATS_COUNT_ERRORS_AS_MISSES") {
            self.stats.count_errors_as_misses = parse_var("STATS_COUNT_ERRORS_AS_MISSES", &flag)?;
        }

        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.cache_store.ttl_secs == 0 {
            return Err(EventCacheError::Config(
                "cache TTL must be at least one second".to_string(),
            ));
        }
        if self.document_store.uri.trim().is_empty() {
            return Err(EventCacheError::Config(
                "MongoDB connection string is empty".to_string(),
            ));
        }
        if self.document_store.database.trim().is_empty()
            || self.document_store.collection.trim().is_empty()
        {
            return Err(EventCacheError::Config(
                "MongoDB database and collection must be set".to_string(),
            ));
        }
        if self.document_store.id_field.trim().is_empty() {
            return Err(EventCacheError::Config(
                "identifier field must be set".to_string(),
            ));
        }
        if self.server.lookup_timeout_ms == 0 || self.server.health_probe_interval_ms == 0 {
            return Err(EventCacheError::Config(
                "timeouts and probe interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_store.ttl_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.server.lookup_timeout_ms)
    }

    pub fn health_probe_interval(&self) -> Duration {
        Duration::from_millis(self.server.health_probe_interval_ms)
    }
}

impl CacheStoreConfig {
    /// `redis://[user[:password]@]host:port/` with credentials percent-encoded
    pub fn connection_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("redis://{}:{}/", self.host, self.port))
            .map_err(|e| EventCacheError::Config(format!("invalid Redis address: {}", e)))?;

        if let Some(ref username) = self.username {
            url.set_username(username)
                .map_err(|_| EventCacheError::Config("invalid Redis username".to_string()))?;
        }
        if let Some(ref password) = self.password {
            url.set_password(Some(password))
                .map_err(|_| EventCacheError::Config("invalid Redis password".to_string()))?;
        }
        Ok(url)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        EventCacheError::Config(format!("{} has invalid value {:?}: {}", name, raw, e))
    })
}
