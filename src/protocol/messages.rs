use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    envelope::{Envelope, MessageType},
    presence::{PresenceAction, UserPresence},
    room_id::RoomId,
};
use crate::{
    errors::ProtocolError,
    operation_transformation::{Operation, Position, Selection},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub room_id: RoomId,
    pub project_id: String,
    pub file_id: String,
}

impl JoinData {
    #[must_use]
    pub fn new(project_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        let (project_id, file_id) = (project_id.into(), file_id.into());

        Self {
            room_id: RoomId::new(&project_id, &file_id),
            project_id,
            file_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveData {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationData {
    pub operation: Operation,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorData {
    pub room_id: RoomId,
    pub cursor_position: Position,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,

    #[serde(default)]
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceData {
    pub room_id: RoomId,
    pub user: UserPresence,
    pub action: PresenceAction,
}

/// Full state of a room. Receiving one supersedes everything a client
/// believed about the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    pub room_id: RoomId,
    pub content: String,
    pub revision: u64,
    pub users: Vec<UserPresence>,
}

/// A client asking for a fresh `SyncData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeData {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeData {
    pub room_id: RoomId,
    pub file_id: String,
    pub new_content: String,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The client's state can't be reconciled incrementally, it has to send
    /// a sync request.
    SyncRequired,
    InvalidMessage,
    NotJoined,
    RoomFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
}

/// Confirms to an author that their operation became `revision - 1 -> revision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckData {
    pub room_id: RoomId,
    pub operation_id: Uuid,
    pub revision: u64,
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Join(JoinData),
    Leave(LeaveData),
    Operation(OperationData),
    Cursor(CursorData),
    Sync(SyncRequest),
}

impl ClientMessage {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            ClientMessage::Join(_) => MessageType::Join,
            ClientMessage::Leave(_) => MessageType::Leave,
            ClientMessage::Operation(_) => MessageType::Operation,
            ClientMessage::Cursor(_) => MessageType::Cursor,
            ClientMessage::Sync(_) => MessageType::Sync,
        }
    }

    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        match self {
            ClientMessage::Join(JoinData { room_id, .. })
            | ClientMessage::Leave(LeaveData { room_id })
            | ClientMessage::Operation(OperationData { room_id, .. })
            | ClientMessage::Cursor(CursorData { room_id, .. })
            | ClientMessage::Sync(SyncRequest { room_id }) => room_id,
        }
    }

    pub fn to_envelope(&self, user_id: Option<String>) -> Result<Envelope, ProtocolError> {
        let message_type = self.message_type();

        match self {
            ClientMessage::Join(data) => Envelope::wrap(message_type, data, user_id),
            ClientMessage::Leave(data) => Envelope::wrap(message_type, data, user_id),
            ClientMessage::Operation(data) => Envelope::wrap(message_type, data, user_id),
            ClientMessage::Cursor(data) => Envelope::wrap(message_type, data, user_id),
            ClientMessage::Sync(data) => Envelope::wrap(message_type, data, user_id),
        }
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        Ok(match envelope.message_type {
            MessageType::Join => ClientMessage::Join(envelope.payload()?),
            MessageType::Leave => ClientMessage::Leave(envelope.payload()?),
            MessageType::Operation => ClientMessage::Operation(envelope.payload()?),
            MessageType::Cursor => ClientMessage::Cursor(envelope.payload()?),
            MessageType::Sync => ClientMessage::Sync(envelope.payload()?),
            other @ (MessageType::Presence
            | MessageType::Welcome
            | MessageType::FileChange
            | MessageType::Error
            | MessageType::Ack) => return Err(ProtocolError::UnexpectedType(other)),
        })
    }

    pub fn encode(&self, user_id: Option<String>) -> Result<String, ProtocolError> {
        self.to_envelope(user_id)?.encode()
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::decode(text)?)
    }
}

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Welcome,
    Operation(OperationData),

    /// A relayed caret update, `user_id` names whose caret it is.
    Cursor {
        user_id: String,
        data: CursorData,
    },
    Presence(PresenceData),
    Sync(SyncData),
    FileChange(FileChangeData),
    Error(ErrorData),
    Ack(AckData),
}

impl ServerMessage {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMessage::Welcome => MessageType::Welcome,
            ServerMessage::Operation(_) => MessageType::Operation,
            ServerMessage::Cursor { .. } => MessageType::Cursor,
            ServerMessage::Presence(_) => MessageType::Presence,
            ServerMessage::Sync(_) => MessageType::Sync,
            ServerMessage::FileChange(_) => MessageType::FileChange,
            ServerMessage::Error(_) => MessageType::Error,
            ServerMessage::Ack(_) => MessageType::Ack,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, code: Option<ErrorCode>, room_id: Option<RoomId>) -> Self {
        ServerMessage::Error(ErrorData {
            message: message.into(),
            code,
            room_id,
        })
    }

    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        let message_type = self.message_type();

        match self {
            ServerMessage::Welcome => Envelope::wrap(message_type, &WelcomeData::default(), None),
            ServerMessage::Operation(data) => Envelope::wrap(
                message_type,
                data,
                Some(data.operation.author_id.clone()),
            ),
            ServerMessage::Cursor { user_id, data } => {
                Envelope::wrap(message_type, data, Some(user_id.clone()))
            }
            ServerMessage::Presence(data) => {
                Envelope::wrap(message_type, data, Some(data.user.user_id.clone()))
            }
            ServerMessage::Sync(data) => Envelope::wrap(message_type, data, None),
            ServerMessage::FileChange(data) => Envelope::wrap(message_type, data, None),
            ServerMessage::Error(data) => Envelope::wrap(message_type, data, None),
            ServerMessage::Ack(data) => Envelope::wrap(message_type, data, None),
        }
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        Ok(match envelope.message_type {
            MessageType::Welcome => ServerMessage::Welcome,
            MessageType::Operation => ServerMessage::Operation(envelope.payload()?),
            MessageType::Cursor => ServerMessage::Cursor {
                user_id: envelope.user_id.clone().unwrap_or_default(),
                data: envelope.payload()?,
            },
            MessageType::Presence => ServerMessage::Presence(envelope.payload()?),
            MessageType::Sync => ServerMessage::Sync(envelope.payload()?),
            MessageType::FileChange => ServerMessage::FileChange(envelope.payload()?),
            MessageType::Error => ServerMessage::Error(envelope.payload()?),
            MessageType::Ack => ServerMessage::Ack(envelope.payload()?),
            other @ (MessageType::Join | MessageType::Leave) => {
                return Err(ProtocolError::UnexpectedType(other));
            }
        })
    }

    pub fn encode(&self) -> Result<String, ProtocolError> { self.to_envelope()?.encode() }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::decode(text)?)
    }
}
