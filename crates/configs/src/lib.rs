//! # configs
//!
//! Layered settings for the forum binaries.
//!
//! Sources, lowest precedence first: built-in defaults, `config/default.toml`,
//! `config/local.toml`, a `.env` file, then `FORUM__SECTION__KEY` variables.
//! `DATABASE_URL` fills the database URL when nothing else does.

use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "FORUM";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads settings from the working directory and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal outside development.
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::build(builder, std::env::var("DATABASE_URL").ok())
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.max_connections", 16)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("database.run_migrations", true)?
            .set_default("storage.backend", "memory")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?)
    }

    fn build(
        builder: ConfigBuilder<config::builder::DefaultState>,
        database_url_fallback: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        if settings.database.url.is_none() {
            settings.database.url = database_url_fallback.map(SecretString::from);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        let has_url = self
            .database
            .url
            .as_ref()
            .is_some_and(|u| !u.expose_secret().is_empty());
        if self.storage.backend == StorageBackend::Postgres && !has_url {
            return Err(ConfigError::Invalid(
                "the postgres backend needs database.url or DATABASE_URL".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    fn from_toml(toml: &str, env: &[(&str, &str)], fallback: Option<&str>) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let builder = Settings::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars)),
            );
        Settings::build(builder, fallback.map(str::to_owned))
    }

    #[test]
    fn defaults_select_memory_backend() {
        let settings = from_toml("", &[], None).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert!(settings.database.url.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let settings = from_toml(
            "[server]\nport = 8080\n[log]\nformat = \"json\"",
            &[("FORUM__SERVER__PORT", "9090")],
            None,
        )
        .unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.server.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let err = from_toml("[storage]\nbackend = \"postgres\"", &[], None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn database_url_fallback_applies() {
        let settings = from_toml(
            "[storage]\nbackend = \"postgres\"",
            &[],
            Some("postgres://localhost/forum"),
        )
        .unwrap();
        let url = settings.database.url.unwrap();
        assert_eq!(url.expose_secret(), "postgres://localhost/forum");
    }

    #[test]
    fn prefixed_url_wins_over_fallback() {
        let settings = from_toml(
            "",
            &[("FORUM__DATABASE__URL", "postgres://primary/forum")],
            Some("postgres://fallback/forum"),
        )
        .unwrap();
        assert_eq!(
            settings.database.url.unwrap().expose_secret(),
            "postgres://primary/forum"
        );
    }

    #[test]
    fn zero_port_is_rejected() {
        let err = from_toml("[server]\nport = 0", &[], None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_pool_is_rejected() {
        let err = from_toml("[database]\nmax_connections = 0", &[], None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
