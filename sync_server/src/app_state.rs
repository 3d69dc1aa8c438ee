use std::{ffi::OsString, sync::Arc};

use anyhow::Result;
use document_store::InMemoryDocumentStore;
use rooms::RoomRegistry;

use crate::{config::Config, consts::DEFAULT_CONFIG_PATH};

pub mod broadcasts;
pub mod document_store;
pub mod rooms;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub rooms: RoomRegistry,
}

impl AppState {
    pub async fn try_new(config_path: Option<OsString>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(|| OsString::from(DEFAULT_CONFIG_PATH));
        let path = std::path::PathBuf::from(config_path);

        let config = Config::read_or_create(&path).await?;

        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        let rooms = RoomRegistry::new(&config, Arc::new(InMemoryDocumentStore::new()));

        Self { config, rooms }
    }
}
