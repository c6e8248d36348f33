//! # Configuration
//!
//! Application settings come from defaults, an optional TOML file and
//! environment variables, in increasing order of precedence.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `LENNA_ENV`, then `APP_ENV`, then `RACK_ENV` | deployment environment | `development` |
//! | `LENNA_DUPLICATE_ROUTES` | `reject` or `overwrite` | `reject` |
//! | `LENNA_LOG_LEVEL` | filter directive | `info` |
//! | `LENNA_LOG_FORMAT` | `json` or `pretty` | `json` |
//! | `LENNA_LOG_INCLUDE_LOCATION` | `true`/`false` | `false` |
//! | `LENNA_LOG_TARGET` | `stdout` or `stderr` | `stdout` |
//!
//! ## File format
//!
//! ```toml
//! environment = "production"
//! duplicate_routes = "overwrite"
//!
//! [log]
//! level = "debug"
//! format = "pretty"
//! ```
//!
//! Missing keys take their defaults.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::router::DuplicatePolicy;

pub use crate::logging::{LogConfig, LogFormat, LogTarget};

const ENV_VARS: [&str; 3] = ["LENNA_ENV", "APP_ENV", "RACK_ENV"];

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
    Local,
}

impl Environment {
    /// Read from the first set variable among `LENNA_ENV`, `APP_ENV` and
    /// `RACK_ENV`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through `lookup`.
    ///
    /// An unrecognized value is treated as [`Environment::Production`] so that
    /// a typo never turns error details on.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let Some((var, value)) = ENV_VARS
            .iter()
            .find_map(|var| lookup(var).map(|value| (*var, value)))
        else {
            return Self::default();
        };

        value.parse().unwrap_or_else(|_| {
            warn!(variable = var, value = %value, "Unknown environment, using production");
            Environment::Production
        })
    }

    /// Whether error pages may include the failure message.
    #[must_use]
    pub fn shows_error_details(self) -> bool {
        matches!(self, Environment::Development | Environment::Test)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
            Environment::Local => "local",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            "local" => Ok(Environment::Local),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for an [`Application`](crate::app::Application).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub duplicate_routes: DuplicatePolicy,
    pub log: LogConfig,
}

impl AppConfig {
    /// Defaults overridden by environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variables on top of `self`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply variables read through `lookup` on top of `self`.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if ENV_VARS.iter().any(|var| lookup(var).is_some()) {
            self.environment = Environment::from_lookup(&lookup);
        }
        if let Some(policy) = lookup("LENNA_DUPLICATE_ROUTES") {
            match policy.parse() {
                Ok(policy) => self.duplicate_routes = policy,
                Err(e) => warn!(error = %e, "Ignoring LENNA_DUPLICATE_ROUTES"),
            }
        }
        self.log.apply_overrides(&lookup);
        self
    }

    /// Parse TOML settings.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse application config")
    }

    /// Read TOML settings from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("Invalid config file {}", path.display()))
    }
}
