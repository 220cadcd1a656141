//! Service configuration.
//!
//! Settings are read once at startup, either from the environment (or a
//! `.env` file via `dotenvy`) or from the JSON object a deployment
//! collaborator hands over. The dotted key names are the stable contract;
//! the environment variable for a key is its upper-snake form
//! (`jdbc.max_pool_size` → `JDBC_MAX_POOL_SIZE`).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Database connection string.
pub const KEY_JDBC_URL: &str = "jdbc.url";
/// Upper bound on concurrently pooled connections.
pub const KEY_MAX_POOL_SIZE: &str = "jdbc.max_pool_size";
/// Milliseconds to wait for a free pooled connection.
pub const KEY_ACQUIRE_TIMEOUT_MS: &str = "jdbc.acquire_timeout_ms";
/// Milliseconds a single statement may run.
pub const KEY_QUERY_TIMEOUT_MS: &str = "jdbc.query_timeout_ms";
/// Optional override path for the query catalog.
pub const KEY_SQL_QUERIES_RESOURCE: &str = "sql_queries.resource";
/// Optional override of the inbound bus address.
pub const KEY_QUEUE: &str = "queue";
/// Per-address buffer size of the message bus.
pub const KEY_BUS_CAPACITY: &str = "bus.capacity";

/// Inbound address used when `queue` is not configured.
pub const DEFAULT_QUEUE: &str = "wikidb.queue";

/// Top-level service configuration.
///
/// Loaded once at startup via [`ServiceConfig::from_env`] or
/// [`ServiceConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Database connection string (e.g. `postgres://host/db`).
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub max_pool_size: u32,

    /// Timeout for acquiring a pooled connection.
    pub acquire_timeout: Duration,

    /// Timeout for a single statement.
    pub query_timeout: Duration,

    /// Query catalog override; `None` selects the bundled default.
    pub sql_queries_resource: Option<PathBuf>,

    /// Bus address the service consumes.
    pub queue: String,

    /// Buffer size of the inbound bus address.
    pub bus_capacity: usize,
}

impl ServiceConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `JDBC_URL` is unset or a numeric
    /// variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(env_name(key)).ok())
    }

    /// Loads configuration from a flat JSON object keyed by the dotted names.
    ///
    /// Numbers may be given as JSON numbers or strings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `jdbc.url` is absent or a numeric key
    /// cannot be parsed.
    pub fn from_json(config: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match config.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    /// Builds a configuration from any key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `jdbc.url` is absent or a numeric key
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(KEY_JDBC_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(KEY_JDBC_URL))?;

        let max_pool_size: u32 = parse_key(&lookup, KEY_MAX_POOL_SIZE, 30)?;
        if max_pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: KEY_MAX_POOL_SIZE,
                value: max_pool_size.to_string(),
            });
        }
        let acquire_timeout_ms = parse_key(&lookup, KEY_ACQUIRE_TIMEOUT_MS, 5_000)?;
        let query_timeout_ms = parse_key(&lookup, KEY_QUERY_TIMEOUT_MS, 2_000)?;
        let bus_capacity = parse_key(&lookup, KEY_BUS_CAPACITY, 1_024)?;

        let sql_queries_resource = lookup(KEY_SQL_QUERIES_RESOURCE)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let queue = lookup(KEY_QUEUE)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUEUE.to_string());

        Ok(Self {
            database_url,
            max_pool_size,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
            query_timeout: Duration::from_millis(query_timeout_ms),
            sql_queries_resource,
            queue,
            bus_capacity,
        })
    }
}

/// Environment variable name for a dotted configuration key.
fn env_name(key: &str) -> String {
    key.replace('.', "_").to_ascii_uppercase()
}

/// Parses `key` as `T`, returning `default` when unset and an error when
/// set to something unparsable.
fn parse_key<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let Ok(config) = ServiceConfig::from_lookup(lookup_from(&[(
            "jdbc.url",
            "postgres://localhost/wiki",
        )])) else {
            panic!("valid config");
        };
        assert_eq!(config.max_pool_size, 30);
        assert_eq!(config.query_timeout, Duration::from_millis(2_000));
        assert_eq!(config.queue, DEFAULT_QUEUE);
        assert!(config.sql_queries_resource.is_none());
    }

    #[test]
    fn missing_url_is_an_error() {
        let result = ServiceConfig::from_lookup(lookup_from(&[("queue", "pages")]));
        assert_eq!(result, Err(ConfigError::Missing(KEY_JDBC_URL)));
    }

    #[test]
    fn invalid_number_is_an_error() {
        let result = ServiceConfig::from_lookup(lookup_from(&[
            ("jdbc.url", "sqlite::memory:"),
            ("jdbc.max_pool_size", "lots"),
        ]));
        assert_eq!(
            result,
            Err(ConfigError::Invalid {
                key: KEY_MAX_POOL_SIZE,
                value: "lots".to_string(),
            })
        );
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let result = ServiceConfig::from_lookup(lookup_from(&[
            ("jdbc.url", "sqlite::memory:"),
            ("jdbc.max_pool_size", "0"),
        ]));
        assert_eq!(
            result,
            Err(ConfigError::Invalid {
                key: KEY_MAX_POOL_SIZE,
                value: "0".to_string(),
            })
        );
    }

    #[test]
    fn json_object_accepts_numbers_and_overrides() {
        let json = serde_json::json!({
            "jdbc.url": "sqlite::memory:",
            "jdbc.max_pool_size": 4,
            "sql_queries.resource": "/etc/wikidb/queries.properties",
            "queue": "pages.queue"
        });
        let Ok(config) = ServiceConfig::from_json(&json) else {
            panic!("valid config");
        };
        assert_eq!(config.max_pool_size, 4);
        assert_eq!(config.queue, "pages.queue");
        assert_eq!(
            config.sql_queries_resource,
            Some(PathBuf::from("/etc/wikidb/queries.properties"))
        );
    }

    #[test]
    fn env_names_are_upper_snake() {
        assert_eq!(env_name(KEY_MAX_POOL_SIZE), "JDBC_MAX_POOL_SIZE");
        assert_eq!(env_name(KEY_SQL_QUERIES_RESOURCE), "SQL_QUERIES_RESOURCE");
    }
}
