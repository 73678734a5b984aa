//! Client configuration
//!
//! Values are layered, lowest priority first:
//! 1. Built-in defaults (local development endpoints)
//! 2. Optional TOML file (`--config` or `TEXTDATA_CONFIG`)
//! 3. Environment variables prefixed with `TEXTDATA_`, nested keys split by `__`
//!    (e.g. `TEXTDATA_RECONNECT__ENABLED=true`)

use crate::error::{Result, TextdataError};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "TEXTDATA_CONFIG";

/// Reconnect behavior for the realtime session socket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Reconnect after an abnormal close while still logged in
    pub enabled: bool,
    /// Initial reconnection delay
    pub initial_delay_secs: u64,
    /// Maximum reconnection delay
    pub max_delay_secs: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_secs: 1,
            max_delay_secs: 60,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given reconnect attempt (0-based), doubling up to the cap
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.min(32));
        let secs = self
            .initial_delay_secs
            .saturating_mul(factor)
            .min(self.max_delay_secs);
        Duration::from_secs(secs)
    }
}

/// Configuration for the TextData client core
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API, including the trailing `api/`
    pub api_base_url: String,

    /// Public website URL; submission links are built from it
    pub website_url: String,

    /// Realtime notification endpoint
    pub realtime_url: String,

    /// Number of suggestions requested by the submission editor
    pub autocomplete_topn: usize,

    /// Timeout for suggestion requests
    pub request_timeout_ms: u64,

    /// Timeout for the realtime handshake
    pub connect_timeout_ms: u64,

    /// Location of the persisted token jar
    pub token_file: Option<PathBuf>,

    /// Realtime reconnect behavior
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api/".to_string(),
            website_url: "http://localhost:3000/".to_string(),
            realtime_url: "ws://localhost:8090/".to_string(),
            autocomplete_topn: 5,
            request_timeout_ms: 5000,
            connect_timeout_ms: 5000,
            token_file: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from defaults, the optional file named by
    /// `TEXTDATA_CONFIG`, and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration with an explicit (optional) config file
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            debug!("Loading config file: {}", path.display());
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("TEXTDATA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.autocomplete_topn == 0 {
            return Err(TextdataError::Config(config::ConfigError::Message(
                "autocomplete_topn must be at least 1".to_string(),
            )));
        }
        if !self.realtime_url.starts_with("ws://") && !self.realtime_url.starts_with("wss://") {
            return Err(TextdataError::Config(config::ConfigError::Message(format!(
                "realtime_url must be a ws:// or wss:// URL, got {}",
                self.realtime_url
            ))));
        }
        Ok(())
    }

    /// Token jar path, falling back to the platform data directory
    pub fn token_file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.token_file {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "textdata", "textdata").ok_or_else(|| {
            TextdataError::Config(config::ConfigError::Message(
                "Failed to determine data directory".to_string(),
            ))
        })?;
        Ok(dirs.data_local_dir().join("cookies.json"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
