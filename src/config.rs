use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:3000";

/// Connection attempts before the socket gives up for good.
pub const RECONNECTION_ATTEMPTS: u32 = 3;
/// Minimum spacing between two non-forced catalog fetches.
pub const CATALOG_COOLDOWN: Duration = Duration::from_secs(60);
/// How long a live banner stays on screen.
pub const BANNER_LIFETIME: Duration = Duration::from_secs(6);

/// Settings shared by every component of the client.
///
/// Durations are given in milliseconds when deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub socket_url: String,
    pub storage_dir: PathBuf,
    pub reconnection_attempts: u32,
    #[serde(with = "millis")]
    pub reconnection_delay: Duration,
    #[serde(with = "millis")]
    pub catalog_cooldown: Duration,
    #[serde(with = "millis")]
    pub banner_lifetime: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            storage_dir: std::env::temp_dir().join("livescore"),
            reconnection_attempts: RECONNECTION_ATTEMPTS,
            reconnection_delay: Duration::from_secs(1),
            catalog_cooldown: CATALOG_COOLDOWN,
            banner_lifetime: BANNER_LIFETIME,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `LIVESCORE_API_URL`, `LIVESCORE_SOCKET_URL`
    /// and `LIVESCORE_STORAGE_DIR` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("LIVESCORE_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("LIVESCORE_SOCKET_URL") {
            config.socket_url = url;
        }
        if let Ok(dir) = std::env::var("LIVESCORE_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        config
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
