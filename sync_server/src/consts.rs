pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CLIENTS_PER_ROOM: usize = 256;
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_SEND_QUEUE_SIZE: usize = 256;

pub const DEFAULT_MAX_REPLAY_GAP: u64 = 100;
pub const DEFAULT_EVENT_BUFFER: usize = 1024;
pub const DEFAULT_PRESENCE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_ROOM_IDLE_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS: u64 = 5;

pub const DEFAULT_ADMIN_NAME: &str = "admin";
pub const TOKEN_LENGTH: usize = 64;
