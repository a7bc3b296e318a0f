//! Process configuration resolved from environment variables.
//!
//! `.env` files are loaded by the binary before resolution; command-line
//! flags override the resolved values afterwards.

pub mod helpers;
mod practice;

use std::net::{IpAddr, SocketAddr};

pub use self::helpers::EnvLookup;
pub use self::practice::{
    DEFAULT_PAGE_SIZE, DEFAULT_UPCOMING_DAYS, MAX_UPCOMING_DAYS, PracticeConfig,
};

use self::helpers::{parse_bool_env, parse_env, parse_string_env};
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 5000;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }

    fn from_str(key: &str, value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("unsupported log format '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    fn resolve(env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: parse_env(env, "GRAVATA_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_env(env, "GRAVATA_PORT", DEFAULT_PORT)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Load the demonstration dataset into the store at startup.
    pub seed_demo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub practice: PracticeConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve_with(&|key| std::env::var(key).ok())
    }

    pub fn resolve_with(env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let format_raw = parse_string_env(env, "GRAVATA_LOG_FORMAT", LogFormat::Pretty.as_str())?;
        Ok(Self {
            gateway: GatewayConfig::resolve(env)?,
            database: DatabaseConfig {
                seed_demo: parse_bool_env(env, "GRAVATA_SEED_DEMO", true)?,
            },
            practice: PracticeConfig::resolve(env)?,
            logging: LoggingConfig {
                format: LogFormat::from_str("GRAVATA_LOG_FORMAT", &format_raw)?,
            },
        })
    }

    /// Defaults with an ephemeral port and no seed data.
    pub fn for_testing() -> Self {
        Self {
            gateway: GatewayConfig {
                host: IpAddr::from([127, 0, 0, 1]),
                port: 0,
            },
            database: DatabaseConfig { seed_demo: false },
            practice: PracticeConfig::default(),
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::{Config, LogFormat};
    use crate::error::ConfigError;

    fn resolve(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::resolve_with(&|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = resolve(&[]).expect("config");
        assert_eq!(config.gateway.socket_addr().to_string(), "127.0.0.1:5000");
        assert!(config.database.seed_demo);
        assert_eq!(config.practice.upcoming_days, 7);
        assert_eq!(config.practice.page_size, 10);
        assert_eq!(config.practice.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn environment_overrides_every_section() {
        let config = resolve(&[
            ("GRAVATA_HOST", "0.0.0.0"),
            ("GRAVATA_PORT", "8080"),
            ("GRAVATA_SEED_DEMO", "false"),
            ("GRAVATA_LOG_FORMAT", "JSON"),
            ("GRAVATA_UPCOMING_DAYS", "30"),
            ("GRAVATA_PAGE_SIZE", "25"),
            ("GRAVATA_UTC_OFFSET", "-03:00"),
        ])
        .expect("config");
        assert_eq!(config.gateway.socket_addr().to_string(), "0.0.0.0:8080");
        assert!(!config.database.seed_demo);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.practice.upcoming_days, 30);
        assert_eq!(config.practice.page_size, 25);
        assert_eq!(config.practice.utc_offset.local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn invalid_values_name_the_offending_key() {
        for (key, value) in [
            ("GRAVATA_PORT", "70000"),
            ("GRAVATA_HOST", "localhost:80"),
            ("GRAVATA_LOG_FORMAT", "xml"),
            ("GRAVATA_UPCOMING_DAYS", "0"),
            ("GRAVATA_PAGE_SIZE", "1000"),
            ("GRAVATA_UTC_OFFSET", "BRT"),
        ] {
            let err = resolve(&[(key, value)]).expect_err("invalid value must be rejected");
            let ConfigError::InvalidValue { key: reported, .. } = err;
            assert_eq!(reported, key);
        }
    }
}
