use collab_ot::{
    Operation,
    protocol::{AckData, OperationData, RoomId, ServerMessage},
};
use uuid::Uuid;

/// Identifies one WebSocket connection. A user with several tabs open has
/// several of them.
pub type ConnectionId = Uuid;

/// Something that happened in a room, fanned out to every connection in it.
///
/// Acknowledgements travel through the same channel as the operations
/// themselves, so each connection sees them in acceptance order.
#[derive(Clone, Debug)]
pub struct RoomEvent {
    pub origin: Option<ConnectionId>,
    pub kind: RoomEventKind,
}

#[derive(Clone, Debug)]
pub enum RoomEventKind {
    /// `operation` is based on `revision - 1` and produced `revision`.
    OperationAccepted { operation: Operation, revision: u64 },

    /// Sent to everyone but the origin as is.
    Relay(ServerMessage),
}

impl RoomEvent {
    pub fn with_origin(origin: ConnectionId, kind: RoomEventKind) -> Self {
        Self {
            origin: Some(origin),
            kind,
        }
    }

    /// What `connection_id` has to receive about the event, if anything.
    pub fn message_for(&self, connection_id: ConnectionId, room_id: &RoomId) -> Option<ServerMessage> {
        let is_origin = self.origin == Some(connection_id);

        match &self.kind {
            RoomEventKind::OperationAccepted {
                operation,
                revision,
            } => Some(if is_origin {
                ServerMessage::Ack(AckData {
                    room_id: room_id.clone(),
                    operation_id: operation.id,
                    revision: *revision,
                })
            } else {
                ServerMessage::Operation(OperationData {
                    operation: operation.clone(),
                    room_id: room_id.clone(),
                })
            }),
            RoomEventKind::Relay(_) if is_origin => None,
            RoomEventKind::Relay(message) => Some(message.clone()),
        }
    }
}
