//! Configuration port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Port for configuration storage
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration. Missing files yield an empty config.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Persist the configuration
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// Location of the configuration file
    fn path(&self) -> PathBuf;

    /// Whether the configuration file exists
    fn exists(&self) -> bool;

    /// Write a file with defaults. Fails if one already exists.
    async fn init(&self) -> Result<(), ConfigError>;

    /// Defaults overlaid with the stored file
    async fn load_merged(&self) -> Result<AppConfig, ConfigError> {
        Ok(AppConfig::defaults().merge(self.load().await?))
    }
}
