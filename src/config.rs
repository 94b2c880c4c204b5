//! Configuration for the flare reporting client.

use std::{collections::BTreeMap, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use flare_core::{packet::DEFAULT_LOGGER, Dsn, EnvironmentPreparer};
use flare_transport::{client::default_user_agent, TransportConfig};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "flare.toml";

const ENV_PREFIX: &str = "FLARE_";

/// Reporter configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. `FLARE_*` environment variables (highest priority)
/// 2. Configuration file (`flare.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Only the DSN has no usable default; everything else works out of the box.
///
/// # Example
///
/// ```no_run
/// use flare::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Reporting to {}", config.dsn().unwrap());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint descriptor events are sent to.
    ///
    /// Environment variable: `FLARE_DSN`
    #[serde(default)]
    pub dsn: String,
    /// Upper bound for one send in milliseconds.
    ///
    /// Environment variable: `FLARE_TIMEOUT_MS`
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether request bodies are gzip compressed.
    ///
    /// Environment variable: `FLARE_COMPRESSION`
    #[serde(default = "default_compression")]
    pub compression: bool,
    /// Release attached to events that do not carry one.
    ///
    /// Environment variable: `FLARE_RELEASE`
    #[serde(default)]
    pub release: Option<String>,
    /// Deployment environment attached to events that do not carry one.
    ///
    /// Environment variable: `FLARE_ENVIRONMENT`
    #[serde(default)]
    pub environment: Option<String>,
    /// Host name attached to events that do not carry one.
    ///
    /// Environment variable: `FLARE_SERVER_NAME`
    #[serde(default)]
    pub server_name: Option<String>,
    /// Logger name for captures that do not name one.
    ///
    /// Environment variable: `FLARE_LOGGER`
    #[serde(default = "default_logger")]
    pub logger: String,
    /// Tags merged underneath every event's own tags.
    ///
    /// Environment variable: `FLARE_TAGS` (e.g. `{region=eu,tier=web}`)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Whether payloads pass through the built-in scrubber before sending.
    ///
    /// Environment variable: `FLARE_SCRUB_PAYLOADS`
    #[serde(default)]
    pub scrub_payloads: bool,
    /// Log filter used when `RUST_LOG` is unset.
    ///
    /// Environment variable: `FLARE_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides, then validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX));

        Self::from_figment(&figment)
    }

    fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed endpoint descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if `dsn` is not a valid DSN.
    pub fn dsn(&self) -> Result<Dsn> {
        self.dsn.parse().context("Invalid DSN")
    }

    /// Convert to the transport crate's configuration.
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            compression: self.compression,
            user_agent: default_user_agent(),
        }
    }

    /// Convert to the preparer applying deployment metadata.
    pub fn to_preparer(&self) -> EnvironmentPreparer {
        EnvironmentPreparer {
            release: self.release.clone(),
            environment: self.environment.clone(),
            server_name: self.server_name.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.dsn.trim().is_empty() {
            anyhow::bail!("dsn must be set");
        }

        self.dsn()?;

        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than 0");
        }

        if self.logger.trim().is_empty() {
            anyhow::bail!("logger must not be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            timeout_ms: default_timeout_ms(),
            compression: default_compression(),
            release: None,
            environment: None,
            server_name: None,
            logger: default_logger(),
            tags: BTreeMap::new(),
            scrub_payloads: false,
            rust_log: default_log_level(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_compression() -> bool {
    true
}

fn default_logger() -> String {
    DEFAULT_LOGGER.to_string()
}

fn default_log_level() -> String {
    "warn,flare=info".to_string()
}
