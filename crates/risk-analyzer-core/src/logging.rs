//! Structured logging setup.
//!
//! Engines and the job executor emit `tracing` events; this module installs
//! the subscriber that renders them. `RUST_LOG` takes precedence over the
//! configured level.

use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::RiskResult;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per event
    #[default]
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(RiskError::ConfigError(format!(
                "unknown log format '{}'. Use: json, pretty",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `risk_analyzer_core=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        }
    }

    /// Install the global subscriber, writing to stderr. Calling it again
    /// after a subscriber is installed is a no-op.
    pub fn init(&self) -> RiskResult<()> {
        use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = match EnvFilter::try_from_default_env() {
            Ok(f) => f,
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| {
                RiskError::ConfigError(format!("invalid log level '{}': {}", self.level, e))
            })?,
        };

        let subscriber = tracing_subscriber::registry().with(filter);
        match self.format {
            LogFormat::Json => {
                let layer = fmt::layer().json().with_writer(std::io::stderr);
                subscriber.with(layer).try_init().ok();
            }
            LogFormat::Pretty => {
                let layer = fmt::layer().with_writer(std::io::stderr);
                subscriber.with(layer).try_init().ok();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_json_info() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig::development();
        assert!(config.init().is_ok());
        assert!(config.init().is_ok());
    }
}
