use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_HOST, DEFAULT_MAX_CLIENTS_PER_ROOM, DEFAULT_PORT, DEFAULT_SEND_QUEUE_SIZE,
    DEFAULT_SUBMIT_TIMEOUT_MS,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_clients_per_room")]
    pub max_clients_per_room: usize,

    /// How long a submission may wait for its room before the client is
    /// told to resynchronise.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Messages queued for one connection before its handlers wait for the
    /// socket to catch up.
    #[serde(default = "default_send_queue_size")]
    pub send_queue_size: usize,
}

impl ServerConfig {
    pub fn submit_timeout(&self) -> Duration { Duration::from_millis(self.submit_timeout_ms) }
}

fn default_host() -> String {
    debug!("Using default server host: {DEFAULT_HOST}");
    DEFAULT_HOST.to_owned()
}

fn default_port() -> u16 {
    debug!("Using default server port: {DEFAULT_PORT}");
    DEFAULT_PORT
}

fn default_max_clients_per_room() -> usize {
    debug!("Using default max clients per room: {DEFAULT_MAX_CLIENTS_PER_ROOM}");
    DEFAULT_MAX_CLIENTS_PER_ROOM
}

fn default_submit_timeout_ms() -> u64 {
    debug!("Using default submit timeout (ms): {DEFAULT_SUBMIT_TIMEOUT_MS}");
    DEFAULT_SUBMIT_TIMEOUT_MS
}

fn default_send_queue_size() -> usize {
    debug!("Using default send queue size: {DEFAULT_SEND_QUEUE_SIZE}");
    DEFAULT_SEND_QUEUE_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_clients_per_room: default_max_clients_per_room(),
            submit_timeout_ms: default_submit_timeout_ms(),
            send_queue_size: default_send_queue_size(),
        }
    }
}
