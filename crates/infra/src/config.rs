//! Configuration loading and representation.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults (in-memory store, dev JWT secret),
//! 2. `config/bizdesk.toml` if present,
//! 3. environment variables prefixed `BIZDESK__`, e.g. `BIZDESK__STORE=postgres`.

use std::fmt;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::warn;

use bizdesk_observability::LogFormat;

pub const DEFAULT_CONFIG_FILE: &str = "config/bizdesk.toml";
pub const ENV_PREFIX: &str = "BIZDESK";

const DEV_JWT_SECRET: &str = "bizdesk-dev-secret-change-me";

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_max_connections() -> u32 {
    10
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
            bind_addr: default_bind_addr(),
            jwt_secret: None,
            log_format: LogFormat::default(),
        }
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("store", &self.store)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("max_connections", &self.max_connections)
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<set>"))
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load from `config/bizdesk.toml` (optional) and `BIZDESK__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given file (optional) and `BIZDESK__*` variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| {
                ConfigError::Message(format!(
                    "failed to read configuration from {} and environment: {e}",
                    path.display()
                ))
            })?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Message(
                "store = \"postgres\" requires database_url".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Message(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Secret used to verify bearer tokens. Falls back to a fixed development
    /// secret, with a warning.
    pub fn jwt_secret(&self) -> &str {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("jwt_secret is not configured; using the development secret");
                DEV_JWT_SECRET
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.jwt_secret(), DEV_JWT_SECRET);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            store = "postgres"
            database_url = "postgres://localhost/bizdesk"
            max_connections = 4
            bind_addr = "127.0.0.1:9000"
            jwt_secret = "s3cret"
            log_format = "pretty"
            "#,
        );
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/bizdesk"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.jwt_secret(), "s3cret");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let file = write_config("store = \"postgres\"\n");
        assert!(AppConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = AppConfig {
            jwt_secret: Some("s3cret".to_string()),
            database_url: Some("postgres://user:pw@host/db".to_string()),
            ..AppConfig::default()
        };
        let shown = format!("{config:?}");
        assert!(!shown.contains("s3cret"));
        assert!(!shown.contains("pw@host"));
    }
}
