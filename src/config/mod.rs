//! Configuration loading for the teacher API client.

mod loader;
mod types;

pub use loader::{ConfigError, API_BASE_ENV};
pub use types::{ApiConfig, Config, PollConfig, UploadConfig, DEFAULT_API_BASE};
