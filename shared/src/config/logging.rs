//! Log output settings consumed by [`crate::logging::init_tracing`]

use serde::{Deserialize, Serialize};

use super::Environment;

/// Output layout of the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    Json,
    /// Multi-line, colored, with source locations
    Pretty,
    /// Single-line, colored
    Compact,
}

impl LogFormat {
    /// Whether the format writes terminal color codes
    pub fn ansi(&self) -> bool {
        !matches!(self, LogFormat::Json)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive applied when `RUST_LOG` is unset
    pub filter: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl LoggingConfig {
    /// Defaults for `environment`
    ///
    /// Deployed environments log issuance and rotation events as JSON.
    pub fn for_environment(environment: Environment) -> Self {
        let (filter, format) = match environment {
            Environment::Development => ("debug", LogFormat::Pretty),
            Environment::Staging => ("info,tw_core=debug", LogFormat::Json),
            Environment::Production => ("info", LogFormat::Json),
        };

        Self {
            filter: filter.to_string(),
            format,
        }
    }
}
