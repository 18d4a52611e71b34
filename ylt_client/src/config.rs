use std::time::Duration;

use log::*;

pub const DEFAULT_BASE_URL: &str = "https://yuanlitui.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct YltConfig {
    /// Scheme and host of the gateway, without a trailing slash.
    pub base_url: String,
    pub user_agent: String,
    /// Deadline for a single request, connection set-up included.
    pub request_timeout: Duration,
}

impl Default for YltConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl YltConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("EPS_YLT_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("EPS_YLT_BASE_URL not set, using {DEFAULT_BASE_URL}");
                DEFAULT_BASE_URL.to_string()
            });
        let request_timeout = request_timeout_or_default(std::env::var("EPS_YLT_TIMEOUT_SECS").ok());
        Self { base_url, user_agent: DEFAULT_USER_AGENT.to_string(), request_timeout }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// A request timeout of zero would fail every call, so it is treated like an invalid value.
fn request_timeout_or_default(value: Option<String>) -> Duration {
    value
        .and_then(|s| match s.trim().parse::<u64>() {
            Ok(0) => {
                warn!("EPS_YLT_TIMEOUT_SECS must not be zero");
                None
            },
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(e) => {
                warn!("Invalid value for EPS_YLT_TIMEOUT_SECS: {s}. {e}");
                None
            },
        })
        .unwrap_or_else(|| {
            info!("Using the default gateway request timeout of {DEFAULT_TIMEOUT_SECS}s");
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        })
}
