use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fallback base URL when neither the config file nor the environment sets one.
pub const DEFAULT_API_BASE: &str = "https://694fc8f1e1918.myxvest1.ru/uzstudents/api/teacher";

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Settings for the JSON request client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default per-attempt timeout in milliseconds (default: 15000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts for GET requests (default: 1).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Linear backoff step in milliseconds (default: 450).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// TCP connect timeout in milliseconds (default: 5000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Settings for multipart uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Whole-upload timeout in milliseconds (default: 120000).
    #[serde(default = "default_upload_timeout_ms")]
    pub timeout_ms: u64,
    /// Size of each streamed chunk in bytes (default: 65536).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Intervals for the visibility-gated pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_submissions_interval_ms")]
    pub submissions_interval_ms: u64,
    #[serde(default = "default_join_requests_interval_ms")]
    pub join_requests_interval_ms: u64,
    #[serde(default = "default_run_on_focus")]
    pub run_on_focus: bool,
}

fn default_base_url() -> String {
    option_env!("TEACHER_API_BASE")
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_API_BASE)
        .to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    450
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_upload_timeout_ms() -> u64 {
    120_000
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_submissions_interval_ms() -> u64 {
    7_000
}

fn default_join_requests_interval_ms() -> u64 {
    8_000
}

fn default_run_on_focus() -> bool {
    true
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl UploadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_upload_timeout_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            submissions_interval_ms: default_submissions_interval_ms(),
            join_requests_interval_ms: default_join_requests_interval_ms(),
            run_on_focus: default_run_on_focus(),
        }
    }
}
