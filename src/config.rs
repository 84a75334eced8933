//! Provider configuration.
//!
//! Connection settings belong to the [`Client`](crate::client::Client)
//! implementation. What remains here shapes how the provider drives it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Default bound on a single statement, in seconds.
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

/// Settings supplied through the provider's configuration block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Upper bound on each statement round trip, in seconds. `0` disables it.
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,

    /// Log every rendered statement at `info` level.
    #[serde(default)]
    pub log_sql: bool,
}

fn default_statement_timeout_secs() -> u64 {
    DEFAULT_STATEMENT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            statement_timeout_secs: DEFAULT_STATEMENT_TIMEOUT_SECS,
            log_sql: false,
        }
    }
}

impl ProviderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statement timeout. A zero duration disables it.
    ///
    /// The limit is kept in whole seconds; partial seconds round up.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_secs = timeout
            .as_secs()
            .saturating_add(u64::from(timeout.subsec_nanos() > 0));
        self
    }

    /// Log rendered statements at `info` level.
    pub fn with_sql_logging(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }

    /// The statement timeout, or `None` when disabled.
    pub fn statement_timeout(&self) -> Option<Duration> {
        (self.statement_timeout_secs > 0).then(|| Duration::from_secs(self.statement_timeout_secs))
    }

    /// Decode the configuration block. A null block yields the defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| ProviderError::Configuration(e.to_string()))
    }

    /// Schema of the configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "statement_timeout_secs",
                Attribute::optional_int64().with_description(
                    "Seconds to wait for each statement before giving up. 0 disables the limit.",
                ),
            )
            .with_attribute(
                "log_sql",
                Attribute::optional_bool()
                    .with_description("Log every statement sent to the platform at info level."),
            )
    }
}
