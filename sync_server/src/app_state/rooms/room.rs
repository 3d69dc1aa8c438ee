use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use collab_ot::{
    Operation,
    protocol::{
        CursorData, FileChangeData, PresenceAction, PresenceData, RoomId, ServerMessage, SyncData,
        UserPresence,
    },
};
use log::{debug, error, info};
use tokio::sync::{Mutex, MutexGuard, broadcast};

use crate::{
    app_state::{
        broadcasts::{ConnectionId, RoomEvent, RoomEventKind},
        document_store::{DocumentStore, StoredDocument},
    },
    config::user_config::User,
    errors::RoomError,
};

/// Limits shared by every room of a registry.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub max_replay_gap: u64,
    pub capacity: usize,
    pub event_buffer: usize,
    pub submit_timeout: Duration,
    pub store: Arc<dyn DocumentStore>,
}

/// A freshly subscribed receiver and the state it starts from: every event
/// the receiver yields happened after `sync`.
#[derive(Debug)]
pub struct Subscription {
    pub receiver: broadcast::Receiver<RoomEvent>,
    pub sync: SyncData,
}

/// Authoritative state of one file being edited together.
///
/// Document changes are serialised by the `document` lock, which is the only
/// place where the revision counter is touched. Presence lives behind its
/// own lock so caret updates never wait for a submission. When both are
/// needed, `document` is locked first.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    project_id: String,
    file_id: String,
    settings: RoomSettings,
    document: Mutex<DocumentState>,
    members: Mutex<Members>,
    events: broadcast::Sender<RoomEvent>,
}

#[derive(Debug)]
struct DocumentState {
    content: String,
    revision: u64,

    /// The last accepted operations, oldest first, each rebased onto the
    /// revision it was applied to.
    history: VecDeque<Operation>,
}

#[derive(Debug)]
struct Members {
    users: HashMap<String, UserPresence>,
    connections: HashMap<ConnectionId, String>,
    last_activity: DateTime<Utc>,
    closed: bool,
}

impl Room {
    pub fn new(
        project_id: &str,
        file_id: &str,
        document: StoredDocument,
        settings: RoomSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));

        Self {
            id: RoomId::new(project_id, file_id),
            project_id: project_id.to_owned(),
            file_id: file_id.to_owned(),
            settings,
            document: Mutex::new(DocumentState {
                content: document.content,
                revision: document.revision,
                history: VecDeque::new(),
            }),
            members: Mutex::new(Members {
                users: HashMap::new(),
                connections: HashMap::new(),
                last_activity: Utc::now(),
                closed: false,
            }),
            events,
        }
    }

    pub fn id(&self) -> &RoomId { &self.id }

    pub async fn join(
        &self,
        user: &User,
        connection_id: ConnectionId,
    ) -> Result<Subscription, RoomError> {
        let document = self.lock_document().await?;
        let mut members = self.members.lock().await;

        if members.closed {
            return Err(RoomError::Closed(self.id.clone()));
        }

        if members.connections.len() >= self.settings.capacity {
            return Err(RoomError::Full {
                room_id: self.id.clone(),
                capacity: self.settings.capacity,
            });
        }

        let receiver = self.events.subscribe();
        members.connections.insert(connection_id, user.name.clone());
        members.last_activity = Utc::now();

        let action = if members.users.contains_key(&user.name) {
            PresenceAction::Update
        } else {
            PresenceAction::Join
        };
        let presence = members
            .users
            .entry(user.name.clone())
            .or_insert_with(|| UserPresence::new(&user.name, user.display_name()))
            .clone();

        info!("User '{}' joined room '{}'", user.name, self.id);
        self.send_presence(Some(connection_id), presence, action);

        Ok(Subscription {
            receiver,
            sync: self.sync_data(&document, &members),
        })
    }

    /// Replaces a subscription that fell too far behind.
    pub async fn resubscribe(&self) -> Result<Subscription, RoomError> {
        let document = self.lock_document().await?;
        let members = self.members.lock().await;

        Ok(Subscription {
            receiver: self.events.subscribe(),
            sync: self.sync_data(&document, &members),
        })
    }

    pub async fn snapshot(&self) -> Result<SyncData, RoomError> {
        let document = self.lock_document().await?;
        let members = self.members.lock().await;

        Ok(self.sync_data(&document, &members))
    }

    pub async fn document(&self) -> Result<StoredDocument, RoomError> {
        let document = self.lock_document().await?;

        Ok(StoredDocument {
            content: document.content.clone(),
            revision: document.revision,
        })
    }

    /// Removes the connection. The user's presence goes away with their last
    /// connection. Returns whether the connection was a member.
    pub async fn leave(&self, connection_id: ConnectionId) -> bool {
        let mut members = self.members.lock().await;

        let Some(user_id) = members.connections.remove(&connection_id) else {
            return false;
        };
        members.last_activity = Utc::now();

        let still_connected = members.connections.values().any(|other| other == &user_id);
        if !still_connected {
            if let Some(presence) = members.users.remove(&user_id) {
                self.send_presence(Some(connection_id), presence, PresenceAction::Leave);
            }
        }

        info!("User '{user_id}' left room '{}'", self.id);
        true
    }

    /// Accepts an operation based on any revision still in the history.
    ///
    /// The operation is transformed through everything accepted since its
    /// base, applied, and becomes the next revision, which is returned. The
    /// author is acknowledged and everyone else receives the transformed
    /// operation. Nothing changes when the store refuses the new revision.
    pub async fn submit(
        &self,
        operation: Operation,
        connection_id: ConnectionId,
    ) -> Result<u64, RoomError> {
        let mut document = self.lock_document().await?;

        let (base, current) = (operation.revision, document.revision);
        if base > current {
            return Err(RoomError::FutureRevision { base, current });
        }

        let gap = current - base;
        let replayable = usize::try_from(gap)
            .ok()
            .filter(|gap| gap <= &document.history.len());
        let Some(replay_from) = replayable
            .filter(|_| gap <= self.settings.max_replay_gap)
            .map(|gap| document.history.len() - gap)
        else {
            return Err(RoomError::ReplayGapTooLarge { base, gap });
        };

        let mut transformed = operation;
        for accepted in document.history.range(replay_from..) {
            transformed = transformed.transform(accepted)?.0;
        }

        let content = transformed.apply(&document.content)?;
        let accepted = transformed.rebased(current);
        let revision = current + 1;

        self.persist(&content, revision).await?;

        document.content = content;
        document.revision = revision;
        document.history.push_back(accepted.clone());
        while document.history.len() as u64 > self.settings.max_replay_gap {
            document.history.pop_front();
        }

        debug!(
            "Accepted operation {} in room '{}' as revision {revision} (replayed through {gap})",
            accepted.id, self.id
        );

        self.send(RoomEvent::with_origin(
            connection_id,
            RoomEventKind::OperationAccepted {
                operation: accepted,
                revision,
            },
        ));
        drop(document);

        self.members.lock().await.last_activity = Utc::now();

        Ok(revision)
    }

    /// Takes over the caret of `user`. A presence that expired in the
    /// meantime is recreated and announced again.
    pub async fn update_cursor(
        &self,
        user: &User,
        connection_id: ConnectionId,
        cursor: &CursorData,
    ) -> Result<(), RoomError> {
        let mut members = self.members.lock().await;

        if !members.connections.contains_key(&connection_id) {
            return Err(RoomError::NotMember(self.id.clone()));
        }

        let now = Utc::now();
        members.last_activity = now;

        let is_new = !members.users.contains_key(&user.name);
        let presence = members
            .users
            .entry(user.name.clone())
            .or_insert_with(|| UserPresence::new(&user.name, user.display_name()));
        presence.update_cursor(
            cursor.cursor_position,
            cursor.selection,
            cursor.is_typing,
            now,
        );

        if is_new {
            let presence = presence.clone();
            self.send_presence(Some(connection_id), presence, PresenceAction::Join);
        }

        Ok(())
    }

    /// Sends `message` to every member except `exclude`.
    pub fn broadcast(&self, message: ServerMessage, exclude: Option<ConnectionId>) {
        self.send(RoomEvent {
            origin: exclude,
            kind: RoomEventKind::Relay(message),
        });
    }

    /// Overwrites the document from outside of the session protocol.
    ///
    /// The history is dropped, so pending operations of clients are rejected
    /// and they resynchronise from the `file_change` they receive.
    pub async fn replace_content(&self, content: String) -> Result<u64, RoomError> {
        let mut document = self.lock_document().await?;

        let revision = document.revision + 1;
        self.persist(&content, revision).await?;

        document.content.clone_from(&content);
        document.revision = revision;
        document.history.clear();

        self.broadcast(
            ServerMessage::FileChange(FileChangeData {
                room_id: self.id.clone(),
                file_id: self.file_id.clone(),
                new_content: content,
                revision,
            }),
            None,
        );
        drop(document);

        self.members.lock().await.last_activity = Utc::now();

        info!("Replaced content of room '{}' at revision {revision}", self.id);
        Ok(revision)
    }

    /// Drops presences silent for longer than `presence_timeout` and closes
    /// the room when nobody is left and it has been idle for
    /// `idle_timeout`. Returns whether the room got closed.
    pub async fn remove_expired(
        &self,
        now: DateTime<Utc>,
        presence_timeout: Duration,
        idle_timeout: Duration,
    ) -> bool {
        let mut members = self.members.lock().await;

        let expired = members
            .users
            .values()
            .filter(|presence| presence.is_expired(now, presence_timeout))
            .map(|presence| presence.user_id.clone())
            .collect::<Vec<_>>();

        for user_id in expired {
            if let Some(presence) = members.users.remove(&user_id) {
                info!("Presence of '{user_id}' in room '{}' expired", self.id);
                self.send_presence(None, presence, PresenceAction::Leave);
            }
        }

        let is_idle = (now - members.last_activity)
            .to_std()
            .is_ok_and(|idle| idle > idle_timeout);

        if members.users.is_empty() && members.connections.is_empty() && is_idle {
            members.closed = true;
        }

        members.closed
    }

    async fn lock_document(&self) -> Result<MutexGuard<'_, DocumentState>, RoomError> {
        tokio::time::timeout(self.settings.submit_timeout, self.document.lock())
            .await
            .map_err(|_| RoomError::Busy(self.id.clone()))
    }

    async fn persist(&self, content: &str, revision: u64) -> Result<(), RoomError> {
        let stored = StoredDocument {
            content: content.to_owned(),
            revision,
        };

        self.settings
            .store
            .put(&self.project_id, &self.file_id, stored)
            .await
            .map_err(|error| {
                error!("Failed to persist revision {revision} of room '{}': {error:?}", self.id);
                RoomError::Store(error)
            })
    }

    fn sync_data(&self, document: &DocumentState, members: &Members) -> SyncData {
        let mut users = members.users.values().cloned().collect::<Vec<_>>();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        SyncData {
            room_id: self.id.clone(),
            content: document.content.clone(),
            revision: document.revision,
            users,
        }
    }

    fn send_presence(
        &self,
        origin: Option<ConnectionId>,
        user: UserPresence,
        action: PresenceAction,
    ) {
        self.send(RoomEvent {
            origin,
            kind: RoomEventKind::Relay(ServerMessage::Presence(PresenceData {
                room_id: self.id.clone(),
                user,
                action,
            })),
        });
    }

    /// Nobody listening is not an error.
    fn send(&self, event: RoomEvent) {
        if self.events.send(event).is_err() {
            debug!("No listeners in room '{}'", self.id);
        }
    }
}
