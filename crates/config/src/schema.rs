//! Config schema types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default session service root.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/session";

/// Keep-alive cadence: ten minutes.
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 600;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub session: SessionConfig,
}

/// Session service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Root URL of the session service; `/new` and `/ping` are appended to it.
    pub base_url: String,

    /// Seconds between keep-alive pings.
    pub ping_interval_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Override the `User-Agent` header (defaults to `tether/<version>`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            ping_interval_secs: DEFAULT_PING_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl SessionConfig {
    /// Ping interval, never shorter than one second.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// Request timeout, never shorter than one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
