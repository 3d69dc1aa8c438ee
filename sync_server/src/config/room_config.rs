use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_EVENT_BUFFER, DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS, DEFAULT_MAX_REPLAY_GAP,
    DEFAULT_PRESENCE_TIMEOUT_SECONDS, DEFAULT_ROOM_IDLE_TIMEOUT_SECONDS,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomConfig {
    /// Most revisions an operation may lag behind and still be transformed
    /// instead of rejected. Also the length of the kept history.
    #[serde(default = "default_max_replay_gap")]
    pub max_replay_gap: u64,

    /// Events a room keeps for members that have not read them yet. A member
    /// falling further behind is resynchronised with a snapshot.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    #[serde(default = "default_presence_timeout_seconds")]
    pub presence_timeout_seconds: u64,

    #[serde(default = "default_room_idle_timeout_seconds")]
    pub room_idle_timeout_seconds: u64,

    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,
}

impl RoomConfig {
    pub fn presence_timeout(&self) -> Duration { Duration::from_secs(self.presence_timeout_seconds) }

    pub fn room_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.room_idle_timeout_seconds)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds.max(1))
    }
}

fn default_max_replay_gap() -> u64 {
    debug!("Using default max replay gap: {DEFAULT_MAX_REPLAY_GAP}");
    DEFAULT_MAX_REPLAY_GAP
}

fn default_event_buffer() -> usize {
    debug!("Using default room event buffer: {DEFAULT_EVENT_BUFFER}");
    DEFAULT_EVENT_BUFFER
}

fn default_presence_timeout_seconds() -> u64 {
    debug!("Using default presence timeout (s): {DEFAULT_PRESENCE_TIMEOUT_SECONDS}");
    DEFAULT_PRESENCE_TIMEOUT_SECONDS
}

fn default_room_idle_timeout_seconds() -> u64 {
    debug!("Using default room idle timeout (s): {DEFAULT_ROOM_IDLE_TIMEOUT_SECONDS}");
    DEFAULT_ROOM_IDLE_TIMEOUT_SECONDS
}

fn default_health_check_interval_seconds() -> u64 {
    debug!("Using default health check interval (s): {DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS}");
    DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_replay_gap: default_max_replay_gap(),
            event_buffer: default_event_buffer(),
            presence_timeout_seconds: default_presence_timeout_seconds(),
            room_idle_timeout_seconds: default_room_idle_timeout_seconds(),
            health_check_interval_seconds: default_health_check_interval_seconds(),
        }
    }
}
