use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use crate::protocol::CountrySource;

/// Environment override for the relay's upstream directory host.
pub const UPSTREAM_ENV: &str = "RADIO_UPSTREAM";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Directory host every endpoint is appended to, without trailing slash.
    #[serde(default = "default_upstream_base")]
    pub upstream_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Reject endpoints that could escape the upstream host (`..`, `@`, schemes).
    #[serde(default = "default_restrict_endpoints")]
    pub restrict_endpoints: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Relay endpoint the directory client talks to.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,
    #[serde(default = "default_country_limit")]
    pub country_limit: usize,
    #[serde(default)]
    pub country_source: CountrySource,
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long a stream may take to produce audio before the attempt fails.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_relay_port(),
            upstream_base: default_upstream_base(),
            request_timeout_secs: default_request_timeout_secs(),
            restrict_endpoints: default_restrict_endpoints(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            top_limit: default_top_limit(),
            country_limit: default_country_limit(),
            country_source: CountrySource::default(),
            default_volume: default_volume(),
            request_timeout_secs: default_request_timeout_secs(),
            start_timeout_secs: default_start_timeout_secs(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    8990
}

fn default_upstream_base() -> String {
    "https://de1.api.radio-browser.info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_restrict_endpoints() -> bool {
    true
}

fn default_relay_url() -> String {
    format!("http://{}:{}/api/radio", default_bind_address(), default_relay_port())
}

fn default_top_limit() -> usize {
    100
}

fn default_country_limit() -> usize {
    crate::filter::MAX_COUNTRIES
}

fn default_volume() -> f32 {
    0.7
}

fn default_start_timeout_secs() -> u64 {
    20
}

impl RelayConfig {
    /// Upstream base with the environment override applied.
    pub fn effective_upstream_base(&self) -> String {
        match std::env::var(UPSTREAM_ENV) {
            Ok(value) if !value.trim().is_empty() => value.trim().trim_end_matches('/').to_string(),
            _ => self.upstream_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Like [`Config::load`], but an unreadable or unwritable config falls
    /// back to defaults.  Returns the error so the caller can log it.
    pub fn load_or_default() -> (Self, Option<anyhow::Error>) {
        Self::load_or_default_from(&Self::config_path())
    }

    /// Reads `path`, creating it with defaults when it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn load_or_default_from(path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
