//! Connection target configuration.
//!
//! Values resolve in order: CLI flags, then environment (a `.env` file is
//! loaded at startup), then built-in defaults. Credentials are read as given
//! and never checked here; missing ones show up as a connection error.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default database host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_PORT: u16 = 5433;

/// Default database name.
pub const DEFAULT_DATABASE: &str = "steam";

/// Default destination table.
pub const DEFAULT_TABLE: &str = "game_data";

/// Database user.
pub const ENV_USER: &str = "DB_DEMO_USER";
/// Database password.
pub const ENV_SECRET: &str = "DB_DEMO_SECRET";
pub const ENV_HOST: &str = "STEAMLOAD_DB_HOST";
pub const ENV_PORT: &str = "STEAMLOAD_DB_PORT";
pub const ENV_DATABASE: &str = "STEAMLOAD_DB_NAME";
pub const ENV_TABLE: &str = "STEAMLOAD_TABLE";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Where and as whom the merged table is written.
#[derive(Clone)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub table_name: String,
    pub user: Option<String>,
    pub secret: Option<SecretString>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            table_name: DEFAULT_TABLE.to_string(),
            user: None,
            secret: None,
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("table_name", &self.table_name)
            .field("user", &self.user)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SinkConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_PORT,
                value: port.clone(),
            })?;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            config.database = database;
        }
        if let Some(table) = lookup(ENV_TABLE) {
            config.table_name = table;
        }
        config.user = lookup(ENV_USER);
        config.secret = lookup(ENV_SECRET).map(SecretString::new);

        Ok(config)
    }

    /// Check the connection target. Credentials are not checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        check_identifier("database", &self.database)?;
        check_identifier("table", &self.table_name)?;
        Ok(())
    }

    /// `host:port/database`, for messages.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

fn check_identifier(kind: &'static str, value: &str) -> Result<(), ConfigError> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SinkConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5433);
        assert_eq!(config.database, "steam");
        assert_eq!(config.table_name, "game_data");
        assert!(config.user.is_none());
        assert!(config.secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = SinkConfig::from_lookup(lookup(&[
            (ENV_HOST, "db.internal"),
            (ENV_PORT, "5432"),
            (ENV_TABLE, "games_v2"),
            (ENV_USER, "etl"),
            (ENV_SECRET, "hunter2"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.table_name, "games_v2");
        assert_eq!(config.user.as_deref(), Some("etl"));
        assert_eq!(config.secret.as_ref().unwrap().expose_secret(), "hunter2");
    }

    #[test]
    fn test_bad_port_env() {
        let err = SinkConfig::from_lookup(lookup(&[(ENV_PORT, "fifty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_PORT, .. }));
    }

    #[test]
    fn test_validate_rejects_bad_identifiers() {
        let config = SinkConfig {
            table_name: "game data; drop".into(),
            ..SinkConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIdentifier { kind: "table", .. })
        ));

        let config = SinkConfig {
            port: 0,
            ..SinkConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort)));

        let config = SinkConfig {
            host: "  ".into(),
            ..SinkConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyHost)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = SinkConfig {
            secret: Some(SecretString::new("hunter2".into())),
            ..SinkConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
