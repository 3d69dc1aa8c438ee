//! Messages exchanged between clients and the server over the persistent
//! connection. Every message is a JSON `Envelope`; `ClientMessage` and
//! `ServerMessage` are its typed views per direction.

mod envelope;
mod messages;
mod presence;
mod room_id;

pub use envelope::{Envelope, MessageType};
pub use messages::{
    AckData, ClientMessage, CursorData, ErrorCode, ErrorData, FileChangeData, JoinData, LeaveData,
    OperationData, PresenceData, ServerMessage, SyncData, SyncRequest, WelcomeData,
};
pub use presence::{PresenceAction, UserPresence};
pub use room_id::RoomId;
