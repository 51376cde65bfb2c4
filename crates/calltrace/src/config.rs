//! Interceptor configuration.
//!
//! Every option has a builder method and a serde field, so the same settings can
//! come from code or from a TOML document:
//!
//! ```toml
//! [statement]
//! enabled = true
//! level = "debug"
//! slow_threshold_ms = 500
//!
//! [call]
//! enabled = true
//! level = "info"
//! include_command = true
//! ```

use crate::error::TraceResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::Level;

/// Configuration for [`StatementTraceInterceptor`](crate::StatementTraceInterceptor).
///
/// Enabled by default at `DEBUG`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementTraceConfig {
    /// Whether statements are traced at all.
    pub enabled: bool,
    /// Level the literal statement is logged at. Nothing is reconstructed
    /// unless the sink has this level enabled.
    #[serde(with = "level_name")]
    pub level: Level,
    /// Statements slower than this are also reported as slow.
    #[serde(rename = "slow_threshold_ms", with = "millis", skip_serializing_if = "Option::is_none")]
    pub slow_threshold: Option<Duration>,
}

impl Default for StatementTraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            slow_threshold: None,
        }
    }
}

impl StatementTraceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the slow statement threshold.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Configuration for [`CallTraceInterceptor`](crate::CallTraceInterceptor).
///
/// Disabled by default; logs at `INFO` once enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallTraceConfig {
    /// Whether handler calls are traced at all.
    pub enabled: bool,
    /// Level call records are logged at.
    #[serde(with = "level_name")]
    pub level: Level,
    /// Attach a `curl` reconstruction of the inbound request.
    pub include_command: bool,
    /// Also log calls whose handler failed. Off by default: failed calls
    /// produce no record.
    pub log_failed_calls: bool,
}

impl Default for CallTraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::INFO,
            include_command: true,
            log_failed_calls: false,
        }
    }
}

impl CallTraceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Attach (or not) the `curl` command to each record.
    pub fn include_command(mut self, include: bool) -> Self {
        self.include_command = include;
        self
    }

    /// Emit records for failed calls too.
    pub fn log_failed_calls(mut self, log: bool) -> Self {
        self.log_failed_calls = log;
        self
    }

    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Configuration for both interceptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub statement: StatementTraceConfig,
    pub call: CallTraceConfig,
}

impl TraceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> TraceResult<Self> {
        Ok(toml::from_str(s)?)
    }
}

mod level_name {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Level>()
            .map_err(|_| D::Error::custom(format!("unknown log level `{name}`")))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
