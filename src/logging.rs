//! Tracing subscriber setup.
//!
//! Everything in the crate logs through `tracing` macros; nothing is
//! printed unless the embedding program installs a subscriber, either its
//! own or the one built by [`init`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format: JSON lines for machines, multi-line pretty for people.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// Lenient parse; anything but `pretty` means JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Stream the fmt layer writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Stdout,
    /// Keeps logs apart from command output
    Stderr,
}

impl LogTarget {
    /// Lenient parse; anything but `stderr` means stdout.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "stderr" => LogTarget::Stderr,
            _ => LogTarget::Stdout,
        }
    }

    fn make_writer(self) -> BoxMakeWriter {
        match self {
            LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub level: String,
    pub format: LogFormat,
    /// Include file:line in events
    pub include_location: bool,
    pub target: LogTarget,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            include_location: false,
            target: LogTarget::Stdout,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `LENNA_LOG_LEVEL`, `LENNA_LOG_FORMAT`,
    /// `LENNA_LOG_INCLUDE_LOCATION` and `LENNA_LOG_TARGET`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.apply_overrides(&lookup);
        config
    }

    pub(crate) fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LENNA_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("LENNA_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Some(include) = lookup("LENNA_LOG_INCLUDE_LOCATION").and_then(|s| s.parse().ok()) {
            self.include_location = include;
        }
        if let Some(target) = lookup("LENNA_LOG_TARGET") {
            self.target = LogTarget::parse(&target);
        }
    }
}

/// Install a global subscriber for `config`.
///
/// `RUST_LOG` takes precedence over the configured level when set. The
/// level accepts full filter directives (`info,lenna=debug`); an invalid one
/// is an error. An already installed global subscriber (common in tests) is
/// left in place.
pub fn init(config: &LogConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level `{}`", config.level))?,
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(config.target.make_writer())
            .with_target(true)
            .with_current_span(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(config.target.make_writer())
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    if let Err(e) = installed {
        tracing::debug!(error = %e, "Global subscriber already installed");
    }
    Ok(())
}
