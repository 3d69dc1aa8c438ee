/// Transport state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,

    /// Waiting before the next connection attempt.
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionTrigger {
    Connect,
    Established,
    Lost,
    Disconnect,
}

impl ConnectionState {
    /// The state reached through `trigger`, `None` if it isn't allowed from
    /// the current one.
    #[must_use]
    pub fn next(self, trigger: ConnectionTrigger) -> Option<ConnectionState> {
        match (self, trigger) {
            (_, ConnectionTrigger::Disconnect) => Some(ConnectionState::Disconnected),
            (ConnectionState::Disconnected | ConnectionState::Reconnecting, ConnectionTrigger::Connect) => {
                Some(ConnectionState::Connecting)
            }
            (ConnectionState::Connecting, ConnectionTrigger::Established) => {
                Some(ConnectionState::Connected)
            }
            (ConnectionState::Connecting | ConnectionState::Connected, ConnectionTrigger::Lost) => {
                Some(ConnectionState::Reconnecting)
            }
            _ => None,
        }
    }
}

/// Whether the client takes part in its room.
///
/// Edits are only transmitted once `Joined`, which is reached by adopting the
/// snapshot the server answers a join with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    NotJoined,
    Joining,
    Joined,
}
