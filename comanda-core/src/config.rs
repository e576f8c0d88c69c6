//! Service configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | CONNECT_TIMEOUT_MS | 5000 | How long to wait for store connectivity |
//! | ENVIRONMENT | development | Runtime environment |
//! | LOG_DIR | (none) | Directory for daily rolling log files |

use std::time::Duration;

/// Runtime configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum wait for the store to report reachable before a write path
    /// gives up with `StoreUnavailable`
    pub connect_timeout_ms: u64,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Log file directory; stdout only when unset
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            connect_timeout_ms: std::env::var("CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            environment: "development".into(),
            log_dir: None,
        }
    }
}
