//! Configuration types for hn-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Where the front page lives and how comment links are built
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Scheme filled into same-site links (default: "https")
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Host filled into same-site links (default: "news.ycombinator.com")
    #[serde(default = "default_host")]
    pub host: String,

    /// Path of the front page listing (default: "/")
    #[serde(default = "default_front_page_path")]
    pub front_page_path: String,

    /// Path of an item's comment page; the item id is passed as `?id=` (default: "/item")
    #[serde(default = "default_comment_path")]
    pub comment_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            front_page_path: default_front_page_path(),
            comment_path: default_comment_path(),
        }
    }
}

/// HTTP request settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (default: 3 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Encoding assumed when a response declares no charset (default: "utf-8")
    #[serde(default = "default_encoding")]
    pub default_encoding: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            default_encoding: default_encoding(),
        }
    }
}

/// Download behavior (destination, retry budget, concurrency)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory pages are saved under (default: "./downloads")
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,

    /// Retryable failures tolerated before a resource is given up on (default: 5)
    #[serde(default = "default_retry_max")]
    pub retry_max: u32,

    /// Maximum fetches in flight within one cycle (default: 16)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination_dir: default_destination_dir(),
            retry_max: default_retry_max(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

/// Polling schedule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Pause between polling cycles (default: 360 seconds)
    #[serde(default = "default_update_cycle", with = "duration_serde")]
    pub update_cycle: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_cycle: default_update_cycle(),
        }
    }
}

/// Main configuration for the crawler
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Front page location
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP request settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Polling schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Check settings that would make the crawler misbehave
    pub fn validate(&self) -> Result<()> {
        if self.source.host.trim().is_empty() {
            return Err(config_error("host must not be empty", "source.host"));
        }
        if self.source.scheme.trim().is_empty() {
            return Err(config_error("scheme must not be empty", "source.scheme"));
        }
        if self.fetch.timeout.is_zero() {
            return Err(config_error(
                "timeout must be greater than zero",
                "fetch.timeout",
            ));
        }
        if encoding_rs::Encoding::for_label(self.fetch.default_encoding.as_bytes()).is_none() {
            return Err(config_error(
                &format!("unknown encoding '{}'", self.fetch.default_encoding),
                "fetch.default_encoding",
            ));
        }
        if self.download.max_concurrent_fetches == 0 {
            return Err(config_error(
                "max_concurrent_fetches must be at least 1",
                "download.max_concurrent_fetches",
            ));
        }
        if self.schedule.update_cycle.is_zero() {
            return Err(config_error(
                "update_cycle must be greater than zero",
                "schedule.update_cycle",
            ));
        }
        Ok(())
    }

    /// Absolute URL of the front page listing
    pub fn front_page_url(&self) -> String {
        format!(
            "{}://{}{}",
            self.source.scheme, self.source.host, self.source.front_page_path
        )
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_host() -> String {
    "news.ycombinator.com".to_string()
}

fn default_front_page_path() -> String {
    "/".to_string()
}

fn default_comment_path() -> String {
    "/item".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string()
}

fn default_accept() -> String {
    "*/*".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_retry_max() -> u32 {
    5
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_update_cycle() -> Duration {
    Duration::from_secs(360)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
