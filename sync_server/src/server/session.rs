use std::{collections::HashMap, sync::Arc};

use collab_ot::protocol::{
    ClientMessage, CursorData, ErrorCode, JoinData, OperationData, RoomId, ServerMessage,
};
use log::{debug, error, info, warn};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
};

use crate::{
    app_state::{
        broadcasts::{ConnectionId, RoomEvent},
        rooms::{
            RoomRegistry,
            room::{Room, Subscription},
        },
    },
    config::user_config::User,
    errors::RoomError,
};

/// Protocol state of one authenticated connection.
///
/// Everything the client has to receive goes through `outgoing`, whose single
/// consumer writes it to the socket, so replies and room events are never
/// interleaved mid-message and keep their relative order. The queue is
/// bounded: a full queue stalls the handlers of this connection, and a room
/// whose events pile up meanwhile resynchronises it with a snapshot.
#[derive(Debug)]
pub struct Session {
    connection_id: ConnectionId,
    user: User,
    rooms: RoomRegistry,
    outgoing: mpsc::Sender<ServerMessage>,

    /// Forwarding task per joined room.
    joined: HashMap<RoomId, JoinHandle<()>>,
}

impl Session {
    pub fn new(
        connection_id: ConnectionId,
        user: User,
        rooms: RoomRegistry,
        outgoing: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            connection_id,
            user,
            rooms,
            outgoing,
            joined: HashMap::new(),
        }
    }

    pub fn user(&self) -> &User { &self.user }

    pub async fn send(&self, message: ServerMessage) {
        if self.outgoing.send(message).await.is_err() {
            debug!("Connection of '{}' is already closed", self.user.name);
        }
    }

    /// Handles one text frame. Malformed input is answered, never fatal.
    pub async fn handle_text(&mut self, text: &str) {
        match ClientMessage::decode(text) {
            Ok(message) => self.handle(message).await,
            Err(error) => {
                warn!("Discarding malformed message from '{}': {error}", self.user.name);
                self.reject_malformed(&format!("Malformed message: {error}"))
                    .await;
            }
        }
    }

    pub async fn reject_malformed(&self, reason: &str) {
        self.send(ServerMessage::error(
            reason,
            Some(ErrorCode::InvalidMessage),
            None,
        ))
        .await;
    }

    pub async fn handle(&mut self, message: ClientMessage) {
        let room_id = message.room_id().clone();
        debug!(
            "Received '{}' from '{}' for room '{room_id}'",
            message.message_type(),
            self.user.name
        );

        let result = match message {
            ClientMessage::Join(data) => self.join(&data).await,
            ClientMessage::Leave(data) => {
                self.leave(&data.room_id).await;
                Ok(())
            }
            ClientMessage::Operation(data) => self.submit(data).await,
            ClientMessage::Cursor(data) => self.update_cursor(data).await,
            ClientMessage::Sync(request) => self.sync(&request.room_id).await,
        };

        if let Err(error) = result {
            info!(
                "Rejected request of '{}' in room '{room_id}': {error}",
                self.user.name
            );
            self.send(ServerMessage::error(
                error.to_string(),
                error_code(&error),
                Some(room_id),
            ))
            .await;
        }
    }

    /// Leaves every joined room, called once the socket is gone.
    pub async fn close(&mut self) {
        let room_ids = self.joined.keys().cloned().collect::<Vec<_>>();

        for room_id in room_ids {
            self.leave(&room_id).await;
        }
    }

    async fn join(&mut self, data: &JoinData) -> Result<(), RoomError> {
        if self.joined.contains_key(&data.room_id) {
            return self.sync(&data.room_id).await;
        }

        let (room, Subscription { receiver, sync }) = self
            .rooms
            .join(data, &self.user, self.connection_id)
            .await?;

        // Queued before the forwarder starts so the snapshot precedes every
        // event the receiver yields.
        self.send(ServerMessage::Sync(sync)).await;

        let forwarder = spawn_forwarder(room, receiver, self.connection_id, self.outgoing.clone());
        self.joined.insert(data.room_id.clone(), forwarder);

        Ok(())
    }

    async fn leave(&mut self, room_id: &RoomId) {
        let Some(forwarder) = self.joined.remove(room_id) else {
            debug!("'{}' left room '{room_id}' without joining", self.user.name);
            return;
        };

        forwarder.abort();
        self.rooms.leave(room_id, self.connection_id).await;
    }

    /// Operations are only accepted on behalf of the authenticated user.
    async fn submit(&self, data: OperationData) -> Result<(), RoomError> {
        self.ensure_joined(&data.room_id)?;

        if data.operation.author_id != self.user.name {
            return Err(RoomError::ForeignAuthor {
                user: self.user.name.clone(),
                author: data.operation.author_id,
            });
        }

        self.rooms
            .submit_operation(&data.room_id, data.operation, self.connection_id)
            .await?;

        Ok(())
    }

    async fn update_cursor(&self, data: CursorData) -> Result<(), RoomError> {
        self.ensure_joined(&data.room_id)?;

        self.rooms
            .update_cursor(&self.user, self.connection_id, data)
            .await
    }

    async fn sync(&self, room_id: &RoomId) -> Result<(), RoomError> {
        self.ensure_joined(room_id)?;

        let snapshot = self.rooms.snapshot(room_id).await?;
        self.send(ServerMessage::Sync(snapshot)).await;

        Ok(())
    }

    fn ensure_joined(&self, room_id: &RoomId) -> Result<(), RoomError> {
        if self.joined.contains_key(room_id) {
            Ok(())
        } else {
            Err(RoomError::NotMember(room_id.clone()))
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for forwarder in self.joined.values() {
            forwarder.abort();
        }
    }
}

fn error_code(error: &RoomError) -> Option<ErrorCode> {
    if error.requires_sync() {
        return Some(ErrorCode::SyncRequired);
    }

    match error {
        RoomError::Full { .. } => Some(ErrorCode::RoomFull),
        RoomError::NotFound(_) | RoomError::NotMember(_) => Some(ErrorCode::NotJoined),
        RoomError::InvalidRoomId(_) | RoomError::ForeignAuthor { .. } => {
            Some(ErrorCode::InvalidMessage)
        }
        _ => None,
    }
}

/// Copies the room's events meant for `connection_id` into its queue.
///
/// While the queue is full the room keeps going without this connection; the
/// events it misses are replaced by a snapshot once the queue drains.
fn spawn_forwarder(
    room: Arc<Room>,
    mut receiver: broadcast::Receiver<RoomEvent>,
    connection_id: ConnectionId,
    outgoing: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let message = match receiver.recv().await {
                Ok(event) => match event.message_for(connection_id, room.id()) {
                    Some(message) => message,
                    None => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Connection {connection_id} missed {skipped} events in room '{}', \
                         resynchronising",
                        room.id()
                    );

                    match room.resubscribe().await {
                        Ok(subscription) => {
                            receiver = subscription.receiver;
                            ServerMessage::Sync(subscription.sync)
                        }
                        Err(error) => {
                            error!("Failed to resynchronise connection {connection_id}: {error}");
                            break;
                        }
                    }
                }
                Err(RecvError::Closed) => break,
            };

            if outgoing.send(message).await.is_err() {
                break;
            }
        }
    })
}
