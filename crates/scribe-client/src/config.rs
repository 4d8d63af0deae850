//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration against a local backend.

use std::path::PathBuf;
use std::time::Duration;

use scribe_shared::constants::{API_POLL_INTERVAL_MS, MCP_POLL_INTERVAL_MS};
use scribe_shared::ServiceKind;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend's invoke endpoint.
    /// Env: `SCRIBE_GATEWAY_URL`
    /// Default: `http://127.0.0.1:1420`
    pub gateway_url: String,

    /// Directory holding the local store.
    /// Env: `SCRIBE_DATA_DIR`
    /// Default: none (the platform data directory is used).
    pub data_dir: Option<PathBuf>,

    /// Poll interval for the automation-protocol server status.
    /// Env: `SCRIBE_MCP_POLL_MS`
    pub mcp_poll_interval: Duration,

    /// Poll interval for the HTTP API server status.
    /// Env: `SCRIBE_API_POLL_MS`
    pub api_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:1420".to_string(),
            data_dir: None,
            mcp_poll_interval: Duration::from_millis(MCP_POLL_INTERVAL_MS),
            api_poll_interval: Duration::from_millis(API_POLL_INTERVAL_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SCRIBE_GATEWAY_URL") {
            if !url.trim().is_empty() {
                config.gateway_url = url;
            }
        }

        if let Ok(dir) = std::env::var("SCRIBE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(interval) = read_interval("SCRIBE_MCP_POLL_MS") {
            config.mcp_poll_interval = interval;
        }

        if let Some(interval) = read_interval("SCRIBE_API_POLL_MS") {
            config.api_poll_interval = interval;
        }

        config
    }

    pub fn poll_interval(&self, kind: ServiceKind) -> Duration {
        match kind {
            ServiceKind::Mcp => self.mcp_poll_interval,
            ServiceKind::Api => self.api_poll_interval,
        }
    }
}

fn read_interval(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match parse_interval_ms(&raw) {
        Some(interval) => Some(interval),
        None => {
            tracing::warn!(var, value = %raw, "Invalid poll interval, using default");
            None
        }
    }
}

fn parse_interval_ms(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval(ServiceKind::Mcp), Duration::from_secs(5));
        assert_eq!(config.poll_interval(ServiceKind::Api), Duration::from_secs(2));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval_ms("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_interval_ms("0"), None);
        assert_eq!(parse_interval_ms("soon"), None);
    }
}
