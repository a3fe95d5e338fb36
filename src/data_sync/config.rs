use crate::utils::config_loader::{LoadConfigError, load_from_file};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Path of the one-shot overview endpoint, relative to the API base
pub const OVERVIEW_PATH: &str = "/api/dashboard/overview";
/// Path of the streaming endpoint, relative to the streaming base
pub const FEED_PATH: &str = "/ws/dashboard";
/// Flat delay between push reconnect attempts
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;

/// Configuration for the dashboard synchronization layer.
///
/// Both addresses are optional. With neither set the layer never touches the
/// network and every consumer sees the default snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSyncConfig {
    /// HTTP base address of the dashboard API (pull source, push derivation)
    pub api_base_url: Option<String>,
    /// Explicit streaming base address, bypasses derivation from `api_base_url`
    pub ws_base_url: Option<String>,
    /// Delay between push reconnect attempts in milliseconds
    pub reconnect_delay_ms: u64,
    /// Optional overall timeout for the pull request, transport default when unset
    pub http_timeout_secs: Option<u64>,
}

impl Default for DashboardSyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            ws_base_url: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            http_timeout_secs: None,
        }
    }
}

impl DashboardSyncConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        // The primary base wins, the fallback base is only consulted when it is unset
        if let Some(api_base) = read("DASHBOARD_API_BASE").or_else(|| read("DASHBOARD_API_FALLBACK_BASE")) {
            Url::parse(&api_base).map_err(|e| eyre::eyre!("Invalid DASHBOARD_API_BASE: {}", e))?;
            config.api_base_url = Some(api_base);
        }

        if let Some(ws_base) = read("DASHBOARD_WS_URL") {
            Url::parse(&ws_base).map_err(|e| eyre::eyre!("Invalid DASHBOARD_WS_URL: {}", e))?;
            config.ws_base_url = Some(ws_base);
        }

        if let Some(delay_str) = read("DASHBOARD_RECONNECT_DELAY_MS") {
            config.reconnect_delay_ms = delay_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid DASHBOARD_RECONNECT_DELAY_MS: {}", e))?;
        }

        if let Some(timeout_str) = read("DASHBOARD_HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = Some(
                timeout_str
                    .parse()
                    .map_err(|e| eyre::eyre!("Invalid DASHBOARD_HTTP_TIMEOUT_SECS: {}", e))?,
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file, `${VAR}` references are expanded from the environment
    pub async fn from_file(file_name: String) -> Result<Self, LoadConfigError> {
        load_from_file(file_name).await
    }

    /// API base without trailing slashes, `None` when blank or unset
    pub fn api_base(&self) -> Option<&str> {
        trimmed(self.api_base_url.as_deref())
    }

    /// Full address of the overview endpoint
    pub fn overview_url(&self) -> Option<String> {
        self.api_base().map(|base| format!("{}{}", base, OVERVIEW_PATH))
    }

    /// Full address of the streaming endpoint.
    ///
    /// An explicit streaming base is used as-is. Otherwise the API base is
    /// converted by scheme substitution (`http` to `ws`, `https` to `wss`);
    /// any other scheme yields no streaming endpoint.
    pub fn feed_url(&self) -> Option<String> {
        if let Some(explicit) = trimmed(self.ws_base_url.as_deref()) {
            return Some(format!("{}{}", explicit, FEED_PATH));
        }

        let base = self.api_base()?;
        let ws_base = if base.starts_with("ws://") || base.starts_with("wss://") {
            base.to_string()
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else {
            return None;
        };

        Some(format!("{}{}", ws_base, FEED_PATH))
    }

    /// True when no endpoint of either kind can be contacted
    pub fn is_offline(&self) -> bool {
        self.overview_url().is_none() && self.feed_url().is_none()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value
        .map(|value| value.trim().trim_end_matches('/'))
        .filter(|value| !value.is_empty())
}
