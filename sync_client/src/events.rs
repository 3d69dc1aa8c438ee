use collab_ot::{
    Selection,
    protocol::{CursorData, ErrorData, PresenceData, UserPresence},
};

use crate::connection::ConnectionState;

/// What a client reports to the application embedding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    ConnectionChanged(ConnectionState),

    /// A snapshot of the room has been adopted, after joining or on request.
    Synced {
        revision: u64,
        users: Vec<UserPresence>,
    },

    /// The document changed because of someone else, the editor has to show
    /// `content` with the caret moved to `selection`.
    ContentChanged {
        content: String,
        selection: Selection,
    },

    RemoteCursor {
        user_id: String,
        cursor: CursorData,
    },

    Presence(PresenceData),

    /// The file was replaced outside of the editing session.
    FileChanged { revision: u64 },

    ServerError(ErrorData),

    /// Reconnecting failed `attempts` times in a row, the client stopped.
    Unavailable { attempts: u32 },
}
