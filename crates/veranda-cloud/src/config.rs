//! Cloud bridge configuration.
//!
//! Two values select whether cloud integration is active: the backend URL
//! and the anonymous API key. Absent, empty, or placeholder values disable
//! all cloud behavior and the system runs local-only.

use serde::Deserialize;

/// Environment variable holding the backend base URL.
pub const ENV_CLOUD_URL: &str = "VERANDA_CLOUD_URL";

/// Environment variable holding the anonymous API key.
pub const ENV_CLOUD_ANON_KEY: &str = "VERANDA_CLOUD_ANON_KEY";

/// Placeholder marker; configs shipped in templates contain values like
/// `https://YOUR-PROJECT.example.com`, which must not activate the bridge.
const PLACEHOLDER_MARKER: &str = "YOUR-";

/// Configuration for the cloud bridge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudConfig {
    /// Backend base URL (e.g. `https://db.example.com`).
    #[serde(default)]
    pub url: String,

    /// Anonymous API key sent with every request.
    #[serde(default)]
    pub anon_key: String,
}

impl CloudConfig {
    /// Create a configuration from explicit values.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Read the configuration from the environment.
    ///
    /// Missing variables yield a disabled configuration.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: std::env::var(ENV_CLOUD_URL).unwrap_or_default(),
            anon_key: std::env::var(ENV_CLOUD_ANON_KEY).unwrap_or_default(),
        }
    }

    /// Whether cloud integration is active.
    ///
    /// Disabled when either value is empty or still a template placeholder.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
            && !self.anon_key.is_empty()
            && !self.url.contains(PLACEHOLDER_MARKER)
            && !self.anon_key.contains(PLACEHOLDER_MARKER)
    }

    /// REST endpoint for a table.
    #[must_use]
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url.trim_end_matches('/'))
    }

    /// Endpoint probed by the health check (a trivial query against the
    /// settings table).
    #[must_use]
    pub fn health_url(&self) -> String {
        self.rest_url("settings")
    }

    /// Realtime websocket endpoint, with the key carried as a query
    /// parameter per the channel protocol.
    #[must_use]
    pub fn realtime_url(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.anon_key
        )
    }
}
