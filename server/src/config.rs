//! Configuration management for the server.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
    /// Document collection holding the inventory
    pub collection: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections(value))?,
            None => 10,
        };

        let collection = lookup("INVENTORY_COLLECTION")
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| "inventory".to_string());
        if collection.is_empty() {
            return Err(ConfigError::EmptyCollection);
        }

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            collection,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DATABASE_MAX_CONNECTIONS value: {0}")]
    InvalidMaxConnections(String),

    #[error("INVENTORY_COLLECTION must not be empty")]
    EmptyCollection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/stockroom")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.collection, "inventory");
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/stock"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("INVENTORY_COLLECTION", "pantry"),
        ])
        .unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.collection, "pantry");
    }

    #[test]
    fn missing_database_url() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn invalid_values() {
        let url = ("DATABASE_URL", "postgres://db/stock");
        assert!(matches!(
            load(&[url, ("PORT", "eighty")]),
            Err(ConfigError::InvalidPort)
        ));
        assert!(matches!(
            load(&[url, ("DATABASE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidMaxConnections(_))
        ));
        assert!(matches!(
            load(&[url, ("INVENTORY_COLLECTION", "  ")]),
            Err(ConfigError::EmptyCollection)
        ));
    }
}
