//! Domain error types

use thiserror::Error;

/// Error when parsing a video URL
#[derive(Debug, Clone, Error)]
#[error("Invalid video URL: \"{input}\". Expected an absolute http(s) URL with a host (e.g., https://www.tiktok.com/@user/video/123)")]
pub struct InvalidVideoUrl {
    pub input: String,
}

/// Error when an invalid processing tier is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid processing tier: \"{input}\". Valid tiers are: quick-scan, ai-analysis")]
pub struct InvalidTierError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
