//! Settings loaded from defaults, an optional file and the environment.
//!
//! Precedence (last wins): built-in defaults, the file named by
//! `SETTLER_CONFIG`, then `SETTLER__SECTION__KEY` environment variables
//! (e.g. `SETTLER__DAEMON__POLL_INTERVAL_MS=250`).

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::queue::RetryPolicy;

pub const CONFIG_PATH_VAR: &str = "SETTLER_CONFIG";
const ENV_PREFIX: &str = "SETTLER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub daemon: DaemonSettings,
    pub gateway: GatewaySettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSettings {
    /// Pause after observing an empty queue.
    pub poll_interval_ms: u64,
    /// Deadline for every store / gateway / identity call.
    pub call_timeout_ms: u64,
    /// Passes per task before it is parked; unset means never.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Account that collects incoming payments before they are forwarded.
    pub core_account: String,
    pub quickpay_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl DaemonSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
        }
    }
}

impl Settings {
    /// Load using `SETTLER_CONFIG` and the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        Self::load_from(path.as_deref())
    }

    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Self::defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(std::path::Path::new(path)));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("daemon.poll_interval_ms", 1_000)?
            .set_default("daemon.call_timeout_ms", 5_000)?
            .set_default("gateway.core_account", "4100118177295897")?
            .set_default("gateway.quickpay_base_url", "https://yoomoney.ru/quickpay/confirm")?
            .set_default("log.filter", "info,settler_core=debug")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings {
                poll_interval_ms: 1_000,
                call_timeout_ms: 5_000,
                max_attempts: None,
            },
            gateway: GatewaySettings {
                core_account: "4100118177295897".to_string(),
                quickpay_base_url: "https://yoomoney.ru/quickpay/confirm".to_string(),
            },
            log: LogSettings {
                filter: "info,settler_core=debug".to_string(),
            },
        }
    }
}
