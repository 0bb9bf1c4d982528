// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable honoured for the API key when no other layer sets one.
pub const LEGACY_API_KEY_VAR: &str = "ECHO_NEST_API_KEY";

const DEFAULT_USER_AGENT: &str = concat!("echonest-rs/", env!("CARGO_PKG_VERSION"));

/// Wire format requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

/// What the local limiter does once the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitMode {
    /// Sleep and retry until a slot frees up.
    #[default]
    Block,
    /// Fail the call locally without touching the network.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub scheme: String,
    pub host: String,
    pub selector: String,
    pub version: String,
    pub user_agent: String,
    pub format: ResponseFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            scheme: "http".to_string(),
            host: "developer.echonest.com".to_string(),
            selector: "api".to_string(),
            version: "v4".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            format: ResponseFormat::Json,
        }
    }
}

impl ApiConfig {
    /// `scheme://host/selector/version`, the prefix every method path is appended to.
    pub fn endpoint_base(&self) -> String {
        format!(
            "{}://{}/{}/{}",
            self.scheme,
            self.host.trim_end_matches('/'),
            self.selector.trim_matches('/'),
            self.version.trim_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub call_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub trace_api_calls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            upload_timeout_secs: 300,
            trace_api_calls: false,
        }
    }
}

impl TransportConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub obey_rate_limit: bool,
    pub max_calls: usize,
    pub window_secs: u64,
    pub mode: RateLimitMode,
    pub retry_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            obey_rate_limit: true,
            max_calls: 120,
            window_secs: 60,
            mode: RateLimitMode::Block,
            retry_interval_ms: 500,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoNestConfig {
    pub api: ApiConfig,
    pub transport: TransportConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    /// Foreign-id catalog names that the service files under another name.
    pub idspace_aliases: BTreeMap<String, String>,
}

impl Default for EchoNestConfig {
    fn default() -> Self {
        let idspace_aliases = [("spotify-WW", "spotify"), ("spotifyv2-ZZ", "spotify")]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            api: ApiConfig::default(),
            transport: TransportConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            idspace_aliases,
        }
    }
}

impl EchoNestConfig {
    /// Defaults with the given API key, mostly useful for tests and quick scripts.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.api_key = Some(api_key.into());
        config
    }

    /// Resolve a foreign-id catalog name through the alias table.
    pub fn map_idspace<'a>(&'a self, idspace: &'a str) -> &'a str {
        self.idspace_aliases
            .get(idspace)
            .map(String::as_str)
            .unwrap_or(idspace)
    }
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: ECHONEST_).
///
/// `ECHO_NEST_API_KEY` is consulted last and only fills an API key that is still unset.
pub fn load(config_path: Option<&Path>) -> Result<EchoNestConfig> {
    let mut figment = Figment::from(Serialized::defaults(EchoNestConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("ECHONEST_").split("__"));

    let mut config: EchoNestConfig = figment.extract()?;

    if config.api.api_key.is_none() {
        if let Ok(key) = std::env::var(LEGACY_API_KEY_VAR) {
            debug!(target: "config", "using API key from {}", LEGACY_API_KEY_VAR);
            config.api.api_key = Some(key);
        }
    }

    info!(target: "config", "configuration loaded");
    Ok(config)
}
