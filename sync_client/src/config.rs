use std::time::Duration;

/// Settings of a [`CollabClient`](crate::CollabClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `ws://localhost:3000`.
    pub server_url: String,
    pub token: String,

    /// Author of the operations this client creates.
    pub user_id: String,

    pub initial_backoff: Duration,
    pub max_backoff: Duration,

    /// Consecutive failed connection attempts before giving up.
    pub max_retries: u32,

    /// How long after the last edit the user stops being shown as typing.
    pub typing_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        server_url: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Address of the server's websocket endpoint.
    pub fn websocket_url(&self) -> String {
        format!(
            "{}/ws?token={}",
            self.server_url.trim_end_matches('/'),
            urlencoding::encode(&self.token)
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3000".to_owned(),
            token: String::new(),
            user_id: String::new(),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_retries: 10,
            typing_timeout: Duration::from_secs(2),
        }
    }
}
