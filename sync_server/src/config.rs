use std::path::Path;

use anyhow::{Context as _, Result};
use log::info;
use room_config::RoomConfig;
use serde::{Deserialize, Serialize};
use server_config::ServerConfig;
use tokio::fs;
use user_config::UserConfig;

pub mod room_config;
pub mod server_config;
pub mod user_config;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rooms: RoomConfig,
    #[serde(default)]
    pub users: UserConfig,
}

impl Config {
    /// Loads the configuration and writes it back with every default filled
    /// in, so the file always documents the effective settings.
    pub async fn read_or_create(path: &Path) -> Result<Self> {
        let config = if fs::try_exists(path).await.unwrap_or(false) {
            info!("Loading configuration from '{}'", path.display());
            Self::load_from_file(path).await?
        } else {
            info!("No configuration at '{}', using defaults", path.display());
            Self::default()
        };

        config.write(path).await?;
        info!("Updated configuration at '{}'", path.display());

        Ok(config)
    }

    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).await.with_context(|| {
            format!(
                "Cannot load configuration from disk from {}",
                path.display()
            )
        })?;

        let config = serde_yaml::from_str(&contents).context("Failed to parse configuration")?;

        Ok(config)
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(&self).context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .await
            .context("Failed to write configuration to disk")
    }
}
