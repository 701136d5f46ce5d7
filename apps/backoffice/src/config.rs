//! Back-office configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;

use officine_core::expiry::ExpiryWindow;

/// Back-office configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Expiry window used when a request does not name one (30, 60 or 90)
    pub default_window: ExpiryWindow,

    /// User id recorded as the caller of maintenance sweeps
    pub sweep_user_id: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = match lookup("OFFICINE_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => crate::get_database_path()?,
        };

        let db_max_connections: u32 = lookup("OFFICINE_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("OFFICINE_DB_MAX_CONNECTIONS".to_string()))?;

        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "OFFICINE_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        let default_window = match lookup("OFFICINE_DEFAULT_WINDOW_DAYS") {
            None => ExpiryWindow::default(),
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .and_then(|days| ExpiryWindow::try_from(days).ok())
                .ok_or_else(|| {
                    ConfigError::InvalidValue("OFFICINE_DEFAULT_WINDOW_DAYS".to_string())
                })?,
        };

        Ok(AppConfig {
            db_path,
            db_max_connections,
            default_window,
            sweep_user_id: lookup("OFFICINE_SWEEP_USER_ID")
                .unwrap_or_else(|| "system:sweep".to_string()),
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("Could not create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from(lookup(&[("OFFICINE_DB_PATH", "/tmp/o.db")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/o.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.default_window, ExpiryWindow::Days60);
        assert_eq!(config.sweep_user_id, "system:sweep");
    }

    #[test]
    fn test_window_must_be_30_60_or_90() {
        let config = AppConfig::load_from(lookup(&[
            ("OFFICINE_DB_PATH", "/tmp/o.db"),
            ("OFFICINE_DEFAULT_WINDOW_DAYS", "90"),
        ]))
        .unwrap();
        assert_eq!(config.default_window, ExpiryWindow::Days90);

        let err = AppConfig::load_from(lookup(&[
            ("OFFICINE_DB_PATH", "/tmp/o.db"),
            ("OFFICINE_DEFAULT_WINDOW_DAYS", "45"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "OFFICINE_DEFAULT_WINDOW_DAYS"));
    }

    #[test]
    fn test_rejects_bad_pool_size() {
        let err = AppConfig::load_from(lookup(&[
            ("OFFICINE_DB_PATH", "/tmp/o.db"),
            ("OFFICINE_DB_MAX_CONNECTIONS", "zero"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
