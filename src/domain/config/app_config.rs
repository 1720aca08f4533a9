//! Application configuration value object

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::transcription::ProcessingTier;

/// Default Business Engine endpoint
pub const DEFAULT_ENGINE_URL: &str = "https://pluct-business-engine.romeo-lya2.workers.dev";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub engine_url: Option<String>,
    pub user_jwt: Option<String>,
    pub tier: Option<String>,
    pub job_deadline_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub max_concurrent_jobs: Option<usize>,
    pub replay_buffer: Option<usize>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            engine_url: Some(DEFAULT_ENGINE_URL.to_string()),
            user_jwt: None,
            tier: Some(ProcessingTier::default().as_str().to_string()),
            job_deadline_secs: Some(160),
            poll_interval_secs: Some(2),
            max_concurrent_jobs: Some(4),
            replay_buffer: Some(16),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            engine_url: other.engine_url.or(self.engine_url),
            user_jwt: other.user_jwt.or(self.user_jwt),
            tier: other.tier.or(self.tier),
            job_deadline_secs: other.job_deadline_secs.or(self.job_deadline_secs),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            max_concurrent_jobs: other.max_concurrent_jobs.or(self.max_concurrent_jobs),
            replay_buffer: other.replay_buffer.or(self.replay_buffer),
        }
    }

    /// Read env overrides (PLUCT_ENGINE_URL, PLUCT_USER_JWT) into a config layer
    pub fn from_env() -> Self {
        Self {
            engine_url: std::env::var("PLUCT_ENGINE_URL").ok().filter(|s| !s.is_empty()),
            user_jwt: std::env::var("PLUCT_USER_JWT").ok().filter(|s| !s.is_empty()),
            ..Self::default()
        }
    }

    /// Get the engine URL, or the built-in default
    pub fn engine_url_or_default(&self) -> String {
        self.engine_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string())
    }

    /// Get tier as parsed ProcessingTier, or default if not set/invalid
    pub fn tier_or_default(&self) -> ProcessingTier {
        self.tier
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Overall job deadline, or the 160 s default
    pub fn job_deadline_or_default(&self) -> Duration {
        Duration::from_secs(self.job_deadline_secs.unwrap_or(160))
    }

    /// Status poll interval, or the 2 s default
    pub fn poll_interval_or_default(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.unwrap_or(2))
    }

    /// Concurrent job cap, or 4 if not set
    pub fn max_concurrent_jobs_or_default(&self) -> usize {
        self.max_concurrent_jobs.unwrap_or(4).max(1)
    }

    /// Replay ring size for late subscribers, or 16 if not set
    pub fn replay_buffer_or_default(&self) -> usize {
        self.replay_buffer.unwrap_or(16).max(1)
    }
}
