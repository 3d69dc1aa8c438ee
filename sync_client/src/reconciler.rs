use std::time::Instant;

use collab_ot::{
    Position, Selection,
    protocol::{
        ClientMessage, CursorData, ErrorCode, JoinData, LeaveData, OperationData, RoomId,
        ServerMessage, SyncRequest,
    },
};
use log::{debug, info, warn};

use crate::{
    config::ClientConfig,
    connection::Membership,
    document::ClientDocument,
    errors::ClientError,
    events::ClientEvent,
    typing::TypingIndicator,
};

/// Messages to transmit and events to report after a step of the
/// reconciliation loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Output {
    pub messages: Vec<ClientMessage>,
    pub events: Vec<ClientEvent>,
}

impl Output {
    fn message(message: ClientMessage) -> Self {
        Self {
            messages: vec![message],
            events: vec![],
        }
    }
}

/// Protocol side of a client editing one file: keeps the document, the room
/// membership and the typing indicator consistent with what the server says.
#[derive(Debug)]
pub struct Reconciler {
    join: JoinData,
    document: ClientDocument,
    membership: Membership,
    typing: TypingIndicator,
}

impl Reconciler {
    pub fn new(config: &ClientConfig, project_id: &str, file_id: &str) -> Self {
        Self {
            join: JoinData::new(project_id, file_id),
            document: ClientDocument::new(&config.user_id, file_id),
            membership: Membership::NotJoined,
            typing: TypingIndicator::new(config.typing_timeout),
        }
    }

    pub fn room_id(&self) -> &RoomId { &self.join.room_id }

    pub fn document(&self) -> &ClientDocument { &self.document }

    pub fn membership(&self) -> Membership { self.membership }

    /// Every new connection starts by joining, edits wait for the snapshot.
    pub fn on_connected(&mut self) -> Output {
        self.membership = Membership::Joining;

        Output::message(ClientMessage::Join(self.join.clone()))
    }

    pub fn on_disconnected(&mut self) {
        self.membership = Membership::NotJoined;
        self.typing.reset();
    }

    pub fn leave(&mut self) -> Output {
        let was_member = self.membership != Membership::NotJoined;
        self.membership = Membership::NotJoined;

        if was_member {
            Output::message(ClientMessage::Leave(LeaveData {
                room_id: self.room_id().clone(),
            }))
        } else {
            Output::default()
        }
    }

    pub fn local_change(&mut self, content: &str, now: Instant) -> Output {
        self.typing.touch(now);

        match self.document.local_change(content) {
            Ok(operation) if self.membership == Membership::Joined => {
                let mut output = Output::default();

                if let Some(operation) = operation {
                    output.messages.push(self.operation_message(operation));
                }
                output.messages.push(self.cursor_message());

                output
            }
            Ok(_) => Output::default(),
            Err(error) => self.recover(&error),
        }
    }

    pub fn set_selection(&mut self, selection: Selection) -> Output {
        self.document.set_selection(selection);

        self.cursor_update()
    }

    pub fn request_sync(&self) -> Output {
        if self.membership == Membership::NotJoined {
            return Output::default();
        }

        Output::message(ClientMessage::Sync(SyncRequest {
            room_id: self.room_id().clone(),
        }))
    }

    /// Lets the typing indicator time out.
    pub fn tick(&mut self, now: Instant) -> Output {
        if self.typing.expire(now) {
            self.cursor_update()
        } else {
            Output::default()
        }
    }

    pub fn handle(&mut self, message: ServerMessage) -> Output {
        if let Some(room_id) = room_of(&message).filter(|room_id| *room_id != self.room_id()) {
            debug!("Ignoring '{}' for room '{room_id}'", message.message_type());
            return Output::default();
        }

        match message {
            ServerMessage::Welcome => Output::default(),
            ServerMessage::Sync(sync) => {
                info!("Adopting revision {} of room '{}'", sync.revision, sync.room_id);

                self.document.adopt_sync(sync.content, sync.revision);
                self.membership = Membership::Joined;

                let mut output = Output::default();
                output.events.push(ClientEvent::Synced {
                    revision: sync.revision,
                    users: sync.users,
                });
                output.events.push(self.content_changed());
                output.messages.push(self.cursor_message());

                output
            }
            ServerMessage::Operation(data) => {
                if self.membership != Membership::Joined {
                    debug!("Ignoring operation {} before the snapshot", data.operation.id);
                    return Output::default();
                }

                match self.document.apply_remote(&data.operation) {
                    Ok(true) => Output {
                        messages: vec![],
                        events: vec![self.content_changed()],
                    },
                    Ok(false) => Output::default(),
                    Err(error) => self.recover(&error),
                }
            }
            ServerMessage::Ack(ack) => match self.document.acknowledge(ack.operation_id, ack.revision)
            {
                Ok(Some(next)) if self.membership == Membership::Joined => {
                    Output::message(self.operation_message(next))
                }
                Ok(_) => Output::default(),
                Err(error) => self.recover(&error),
            },
            ServerMessage::Cursor { user_id, data } => Output {
                messages: vec![],
                events: vec![ClientEvent::RemoteCursor {
                    user_id,
                    cursor: data,
                }],
            },
            ServerMessage::Presence(presence) => Output {
                messages: vec![],
                events: vec![ClientEvent::Presence(presence)],
            },
            ServerMessage::FileChange(change) => {
                info!(
                    "File '{}' was replaced at revision {}",
                    change.file_id, change.revision
                );

                self.document.adopt_sync(change.new_content, change.revision);

                Output {
                    messages: vec![],
                    events: vec![
                        ClientEvent::FileChanged {
                            revision: change.revision,
                        },
                        self.content_changed(),
                    ],
                }
            }
            ServerMessage::Error(error) => {
                warn!("Server error: {}", error.message);

                let mut output = match error.code {
                    Some(ErrorCode::SyncRequired) => self.request_sync(),
                    Some(ErrorCode::NotJoined) if self.membership != Membership::NotJoined => {
                        self.on_connected()
                    }
                    _ => Output::default(),
                };
                output.events.push(ClientEvent::ServerError(error));

                output
            }
        }
    }

    /// Structural trouble is never repaired locally, the server's state wins.
    fn recover(&self, error: &ClientError) -> Output {
        warn!("Requesting a snapshot of room '{}': {error}", self.room_id());

        self.request_sync()
    }

    fn cursor_update(&self) -> Output {
        if self.membership == Membership::Joined {
            Output::message(self.cursor_message())
        } else {
            Output::default()
        }
    }

    fn operation_message(&self, operation: collab_ot::Operation) -> ClientMessage {
        ClientMessage::Operation(OperationData {
            operation,
            room_id: self.room_id().clone(),
        })
    }

    /// The typing flag always travels with the caret.
    fn cursor_message(&self) -> ClientMessage {
        let selection = self.document.selection();

        ClientMessage::Cursor(CursorData {
            room_id: self.room_id().clone(),
            cursor_position: Position::from_offset(self.document.content(), selection.end),
            selection: (!selection.is_collapsed()).then_some(selection),
            is_typing: self.typing.is_typing(),
        })
    }

    fn content_changed(&self) -> ClientEvent {
        ClientEvent::ContentChanged {
            content: self.document.content().to_owned(),
            selection: self.document.selection(),
        }
    }
}

fn room_of(message: &ServerMessage) -> Option<&RoomId> {
    match message {
        ServerMessage::Welcome => None,
        ServerMessage::Operation(OperationData { room_id, .. })
        | ServerMessage::Cursor {
            data: CursorData { room_id, .. },
            ..
        } => Some(room_id),
        ServerMessage::Presence(data) => Some(&data.room_id),
        ServerMessage::Sync(data) => Some(&data.room_id),
        ServerMessage::FileChange(data) => Some(&data.room_id),
        ServerMessage::Error(data) => data.room_id.as_ref(),
        ServerMessage::Ack(data) => Some(&data.room_id),
    }
}
