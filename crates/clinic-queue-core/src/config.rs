//! Terminal configuration.
//!
//! Loaded from a TOML file; every field except `api_url` has a default.
//!
//! ```toml
//! api_url = "http://clinic.local:5000"
//! request_timeout_secs = 10
//!
//! [role]
//! kind = "study"
//! study = 3
//!
//! [reconnect]
//! initial_delay_ms = 1000
//! max_delay_ms = 5000
//! jitter = 0.5
//! ```

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::RoomId;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid API URL '{0}': {1}")]
    InvalidUrl(String, String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which logical room a terminal joins on the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalRole {
    /// Reception: receives every patient broadcast
    FrontDesk,
    /// A doctor's station for one study
    Study { study: RoomId },
    /// Passive listener (waiting-room display, agenda board)
    #[default]
    Display,
}

/// Reconnect backoff: exponential with jitter, capped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Randomization factor in [0, 1]
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 5_000,
            jitter: 0.5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms) as f64;

        let jitter = self.jitter.clamp(0.0, 1.0);
        let millis = if jitter > 0.0 {
            let deviation = base * jitter;
            rand::thread_rng().gen_range((base - deviation)..=(base + deviation))
        } else {
            base
        };

        Duration::from_millis(millis.min(self.max_delay_ms as f64) as u64)
    }
}

fn default_timeout() -> u64 {
    10
}

/// Settings for one terminal session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalConfig {
    /// Backend base URL, e.g. `http://localhost:5000`
    pub api_url: String,
    /// Bearer token attached to REST calls
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub role: TerminalRole,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl TerminalConfig {
    /// Config with defaults for everything but the URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_token: None,
            request_timeout_secs: default_timeout(),
            role: TerminalRole::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.api_base()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parsed API base URL, always ending with `/` so relative joins append.
    pub fn api_base(&self) -> ConfigResult<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| ConfigError::InvalidUrl(self.api_url.clone(), e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(
                self.api_url.clone(),
                format!("unsupported scheme {}", url.scheme()),
            ));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
