//! Configuration port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Port for configuration storage.
///
/// `load` on a missing file returns an empty config rather than an
/// error, so callers merge layers without special-casing first runs.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration (empty if the file is absent)
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Persist the given configuration
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// Location of the backing file
    fn path(&self) -> PathBuf;

    /// Whether the backing file exists
    fn exists(&self) -> bool;

    /// Write a fresh config file with defaults.
    /// Fails with `AlreadyExists` rather than overwriting.
    async fn init(&self) -> Result<(), ConfigError>;
}
