use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub suggestions: SuggestionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8090
}

/// Media backend the engine talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://localhost:8080")
    pub url: String,
    /// API prefix appended to the base URL (default: "/api/v1")
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Fan-out search settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Page size for the combined local/rankings search (1..=100).
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
        }
    }
}

fn default_page_limit() -> u32 {
    20
}

/// As-you-type suggestion settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuggestionConfig {
    /// Quiet period after the last keystroke before a request is issued.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum trimmed input length (in characters) that triggers a request.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_chars() -> usize {
    2
}

/// Download monitor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// How often the download client status is polled (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Settle delay before the out-of-cycle poll that follows a mutating action.
    #[serde(default = "default_refresh_delay")]
    pub refresh_delay_ms: u64,
    /// Only tasks carrying this tag are visible.
    #[serde(default = "default_ownership_tag")]
    pub ownership_tag: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            refresh_delay_ms: default_refresh_delay(),
            ownership_tag: default_ownership_tag(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10_000
}

fn default_refresh_delay() -> u64 {
    500
}

fn default_ownership_tag() -> String {
    "PornDB".to_string()
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub backend: SanitizedBackendConfig,
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub suggestions: SuggestionConfig,
    pub monitor: MonitorConfig,
}

/// Backend config with credentials stripped from the URL.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBackendConfig {
    pub url: String,
    pub api_prefix: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            backend: SanitizedBackendConfig {
                url: strip_userinfo(&config.backend.url),
                api_prefix: config.backend.api_prefix.clone(),
                timeout_secs: config.backend.timeout_secs,
            },
            server: config.server.clone(),
            search: config.search.clone(),
            suggestions: config.suggestions.clone(),
            monitor: config.monitor.clone(),
        }
    }
}

/// Drop `user:pass@` from a URL so it can be shown.
fn strip_userinfo(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => match rest.split_once('@') {
            Some((userinfo, host)) if !userinfo.contains('/') => format!("{}://{}", scheme, host),
            _ => url.to_string(),
        },
        None => url.to_string(),
    }
}
