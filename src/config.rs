//! Layered engine configuration.
//!
//! Sources, highest priority first:
//! 1. `SCHEDULE_ENGINE_*` environment variables, `__` separating sections
//!    (`SCHEDULE_ENGINE_DEFAULTS__BUFFER_DAYS=2` sets `defaults.buffer_days`)
//! 2. an explicit TOML file, or `schedule-engine.toml` in the working directory
//! 3. built-in defaults
//!
//! Options sent with a request always override `defaults`.

use crate::auto_schedule::AutoScheduleOptions;
use crate::calendar::CalendarConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PREFIX: &str = "SCHEDULE_ENGINE_";
pub const DEFAULT_CONFIG_FILE: &str = "schedule-engine.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Calendar defaults applied when a request carries no options.
    #[serde(default)]
    pub defaults: CalendarConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl EngineConfig {
    /// Provider chain; `path` replaces the default config file when given.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults
            .validate()
            .map_err(|err| ConfigError::InvalidValue {
                field: "defaults".to_string(),
                reason: err.to_string(),
            })?;
        self.http_addr()?;
        Ok(())
    }

    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http
            .addr
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "http.addr".to_string(),
                reason: err.to_string(),
            })
    }

    pub fn default_options(&self) -> AutoScheduleOptions {
        AutoScheduleOptions::from_calendar(&self.defaults)
    }
}
