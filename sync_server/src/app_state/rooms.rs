use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use collab_ot::{
    Operation,
    protocol::{CursorData, JoinData, RoomId, ServerMessage, SyncData},
};
use log::{debug, info};
use room::{Room, RoomSettings, Subscription};
use tokio::sync::Mutex;

use super::{
    broadcasts::ConnectionId,
    document_store::{DocumentStore, StoredDocument},
};
use crate::{
    config::{Config, room_config::RoomConfig, user_config::User},
    errors::RoomError,
};

pub mod room;

/// Every open room of the server, created on first use and dropped by the
/// background task once they have been abandoned.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    config: RoomConfig,
    settings: RoomSettings,
    rooms: Arc<Mutex<HashMap<RoomId, Arc<Room>>>>,
}

impl RoomRegistry {
    pub fn new(config: &Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: config.rooms.clone(),
            settings: RoomSettings {
                max_replay_gap: config.rooms.max_replay_gap,
                capacity: config.server.max_clients_per_room,
                event_buffer: config.rooms.event_buffer,
                submit_timeout: config.server.submit_timeout(),
                store,
            },
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Adds the connection to the room of `join`, opening it if needed.
    pub async fn join(
        &self,
        join: &JoinData,
        user: &User,
        connection_id: ConnectionId,
    ) -> Result<(Arc<Room>, Subscription), RoomError> {
        if RoomId::new(&join.project_id, &join.file_id) != join.room_id {
            return Err(RoomError::InvalidRoomId(join.room_id.clone()));
        }

        loop {
            let room = self.get_or_create(&join.project_id, &join.file_id).await?;

            match room.join(user, connection_id).await {
                Ok(subscription) => return Ok((room, subscription)),
                Err(RoomError::Closed(room_id)) => {
                    debug!("Room '{room_id}' closed while joining, reopening it");
                    self.forget(&room).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    pub async fn room(&self, room_id: &RoomId) -> Result<Arc<Room>, RoomError> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Returns whether the connection was in the room.
    pub async fn leave(&self, room_id: &RoomId, connection_id: ConnectionId) -> bool {
        match self.room(room_id).await {
            Ok(room) => room.leave(connection_id).await,
            Err(_) => false,
        }
    }

    pub async fn submit_operation(
        &self,
        room_id: &RoomId,
        operation: Operation,
        connection_id: ConnectionId,
    ) -> Result<u64, RoomError> {
        self.room(room_id)
            .await?
            .submit(operation, connection_id)
            .await
    }

    /// Updates the caret of `user` and relays it to everyone else at once.
    pub async fn update_cursor(
        &self,
        user: &User,
        connection_id: ConnectionId,
        cursor: CursorData,
    ) -> Result<(), RoomError> {
        let room_id = cursor.room_id.clone();
        self.room(&room_id)
            .await?
            .update_cursor(user, connection_id, &cursor)
            .await?;

        self.broadcast(
            &room_id,
            ServerMessage::Cursor {
                user_id: user.name.clone(),
                data: cursor,
            },
            Some(connection_id),
        )
        .await
    }

    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        message: ServerMessage,
        exclude: Option<ConnectionId>,
    ) -> Result<(), RoomError> {
        self.room(room_id).await?.broadcast(message, exclude);

        Ok(())
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Result<SyncData, RoomError> {
        self.room(room_id).await?.snapshot().await
    }

    /// Current state of a file, whether or not anyone is editing it.
    pub async fn document(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<StoredDocument, RoomError> {
        let room_id = RoomId::new(project_id, file_id);

        if let Ok(room) = self.room(&room_id).await {
            return room.document().await;
        }

        Ok(self.load(project_id, file_id).await?.unwrap_or_default())
    }

    /// Overwrites a file and notifies everyone editing it.
    pub async fn replace_content(
        &self,
        project_id: &str,
        file_id: &str,
        content: String,
    ) -> Result<u64, RoomError> {
        self.get_or_create(project_id, file_id)
            .await?
            .replace_content(content)
            .await
    }

    /// Expires stale presences and drops the rooms that got abandoned.
    pub async fn remove_expired(&self, now: DateTime<Utc>) {
        let rooms = self.rooms.lock().await.values().cloned().collect::<Vec<_>>();

        for room in rooms {
            let closed = room
                .remove_expired(
                    now,
                    self.config.presence_timeout(),
                    self.config.room_idle_timeout(),
                )
                .await;

            if closed {
                info!("Closing idle room '{}'", room.id());
                self.forget(&room).await;
            }
        }
    }

    pub fn start_background_task(self) {
        tokio::spawn(async move {
            loop {
                self.remove_expired(Utc::now()).await;
                tokio::time::sleep(self.config.health_check_interval()).await;
            }
        });
    }

    /// The store is read without holding the registry lock. When two
    /// connections open the same room at once, the first one inserted wins.
    async fn get_or_create(&self, project_id: &str, file_id: &str) -> Result<Arc<Room>, RoomError> {
        let room_id = RoomId::new(project_id, file_id);

        let existing = self.rooms.lock().await.get(&room_id).cloned();
        if let Some(room) = existing {
            return Ok(room);
        }

        let document = self.load(project_id, file_id).await?.unwrap_or_default();

        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id).or_insert_with_key(|room_id| {
            info!("Opening room '{room_id}' at revision {}", document.revision);
            Arc::new(Room::new(project_id, file_id, document, self.settings.clone()))
        });

        Ok(Arc::clone(room))
    }

    async fn load(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<Option<StoredDocument>, RoomError> {
        self.settings
            .store
            .get(project_id, file_id)
            .await
            .map_err(RoomError::Store)
    }

    /// Removes `room` from the registry unless it has already been replaced.
    async fn forget(&self, room: &Arc<Room>) {
        let mut rooms = self.rooms.lock().await;

        if rooms
            .get(room.id())
            .is_some_and(|current| Arc::ptr_eq(current, room))
        {
            rooms.remove(room.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use collab_ot::{
        TextOperation,
        protocol::{PresenceAction, PresenceData},
    };
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;
    use uuid::Uuid;

    use super::*;
    use crate::app_state::document_store::InMemoryDocumentStore;

    fn user(name: &str) -> User {
        User {
            name: name.to_owned(),
            token: format!("{name}-token"),
            display_name: None,
        }
    }

    async fn registry_with(
        configure: impl FnOnce(&mut Config),
        document: Option<StoredDocument>,
    ) -> RoomRegistry {
        let mut config = Config::default();
        configure(&mut config);

        let store = InMemoryDocumentStore::new();
        if let Some(document) = document {
            store.put("project", "file", document).await.unwrap();
        }

        RoomRegistry::new(&config, Arc::new(store))
    }

    async fn registry() -> RoomRegistry { registry_with(|_| {}, None).await }

    /// Loads slowly for the file `slow` and refuses every write when
    /// `read_only` is set.
    #[derive(Debug, Default)]
    struct TestStore {
        inner: InMemoryDocumentStore,
        read_only: bool,
    }

    #[async_trait]
    impl DocumentStore for TestStore {
        async fn get(
            &self,
            project_id: &str,
            file_id: &str,
        ) -> anyhow::Result<Option<StoredDocument>> {
            if file_id == "slow" {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            self.inner.get(project_id, file_id).await
        }

        async fn put(
            &self,
            project_id: &str,
            file_id: &str,
            document: StoredDocument,
        ) -> anyhow::Result<()> {
            if self.read_only {
                return Err(anyhow!("disk full"));
            }

            self.inner.put(project_id, file_id, document).await
        }
    }

    fn join_data() -> JoinData { JoinData::new("project", "file") }

    fn insert(author: &str, revision: u64, position: usize, text: &str, length: usize) -> Operation {
        Operation::new(
            author,
            "file",
            revision,
            vec![
                TextOperation::Retain(position),
                TextOperation::Insert(text.to_owned()),
                TextOperation::Retain(length - position),
            ],
        )
    }

    /// Next message `connection_id` would be sent, skipping events meant for
    /// others only.
    fn next_message(
        subscription: &mut Subscription,
        connection_id: ConnectionId,
    ) -> Option<ServerMessage> {
        loop {
            match subscription.receiver.try_recv() {
                Ok(event) => {
                    if let Some(message) = event.message_for(connection_id, &subscription.sync.room_id) {
                        return Some(message);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
                Err(TryRecvError::Lagged(_)) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_join_returns_the_stored_document() {
        let registry = registry_with(
            |_| {},
            Some(StoredDocument {
                content: "hello".to_owned(),
                revision: 3,
            }),
        )
        .await;

        let (room, subscription) = registry
            .join(&join_data(), &user("alice"), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(room.id(), &join_data().room_id);
        assert_eq!(subscription.sync.content, "hello");
        assert_eq!(subscription.sync.revision, 3);
        assert_eq!(subscription.sync.users.len(), 1);
        assert_eq!(subscription.sync.users[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_mismatched_room_id_is_rejected() {
        let registry = registry().await;
        let mut join = join_data();
        join.room_id = RoomId::new("project", "other");

        let result = registry.join(&join, &user("alice"), Uuid::new_v4()).await;

        assert!(matches!(result, Err(RoomError::InvalidRoomId(_))));
    }

    #[tokio::test]
    async fn test_stale_operation_is_transformed_through_history() {
        let registry = registry_with(
            |_| {},
            Some(StoredDocument {
                content: "hello world".to_owned(),
                revision: 5,
            }),
        )
        .await;
        let room_id = join_data().room_id;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        registry.join(&join_data(), &user("bob"), bob).await.unwrap();

        let first = insert("alice", 5, 0, ">", 11);
        let second = insert("alice", 6, 12, "!", 12);
        assert_eq!(registry.submit_operation(&room_id, first, alice).await.unwrap(), 6);
        assert_eq!(registry.submit_operation(&room_id, second, alice).await.unwrap(), 7);

        // Still based on the document at revision 5.
        let stale = insert("bob", 5, 5, ",", 11);
        let revision = registry.submit_operation(&room_id, stale, bob).await.unwrap();

        assert_eq!(revision, 8);
        let snapshot = registry.snapshot(&room_id).await.unwrap();
        assert_eq!(snapshot.content, ">hello, world!");
        assert_eq!(snapshot.revision, 8);
    }

    #[tokio::test]
    async fn test_too_stale_operation_requires_sync() {
        let registry = registry_with(|config| config.rooms.max_replay_gap = 2, None).await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();

        for revision in 0..3 {
            let operation = insert("alice", revision, 0, "x", revision as usize);
            registry
                .submit_operation(&room_id, operation, alice)
                .await
                .unwrap();
        }

        let error = registry
            .submit_operation(&room_id, insert("alice", 0, 0, "y", 0), alice)
            .await
            .unwrap_err();

        assert!(matches!(error, RoomError::ReplayGapTooLarge { base: 0, gap: 3 }));
        assert!(error.requires_sync());

        let within_gap = registry
            .submit_operation(&room_id, insert("alice", 1, 0, "y", 1), alice)
            .await;
        assert_eq!(within_gap.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_revision_older_than_the_loaded_document_requires_sync() {
        let registry = registry_with(
            |_| {},
            Some(StoredDocument {
                content: "abc".to_owned(),
                revision: 5,
            }),
        )
        .await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();

        let error = registry
            .submit_operation(&room_id, insert("alice", 3, 0, "x", 3), alice)
            .await
            .unwrap_err();

        assert!(matches!(error, RoomError::ReplayGapTooLarge { base: 3, gap: 2 }));
    }

    #[tokio::test]
    async fn test_future_revision_is_rejected() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();

        let error = registry
            .submit_operation(&room_id, insert("alice", 1, 0, "x", 0), alice)
            .await
            .unwrap_err();

        assert!(matches!(error, RoomError::FutureRevision { base: 1, current: 0 }));
        assert!(error.requires_sync());
        assert_eq!(registry.snapshot(&room_id).await.unwrap().revision, 0);
    }

    #[tokio::test]
    async fn test_mismatched_length_is_rejected() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();

        let error = registry
            .submit_operation(&room_id, insert("alice", 0, 0, "x", 3), alice)
            .await
            .unwrap_err();

        assert!(matches!(error, RoomError::InvalidOperation(_)));
        assert_eq!(registry.snapshot(&room_id).await.unwrap().content, "");
    }

    #[tokio::test]
    async fn test_author_gets_ack_and_others_the_operation() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mut alice_events) = registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        let (_, mut bob_events) = registry.join(&join_data(), &user("bob"), bob).await.unwrap();

        let Some(ServerMessage::Presence(PresenceData { user, action, .. })) =
            next_message(&mut alice_events, alice)
        else {
            panic!("Expected bob's presence");
        };
        assert_eq!(user.user_id, "bob");
        assert_eq!(action, PresenceAction::Join);

        let first = insert("alice", 0, 0, "a", 0);
        let second = insert("alice", 1, 1, "b", 1);
        registry.submit_operation(&room_id, first.clone(), alice).await.unwrap();
        registry.submit_operation(&room_id, second.clone(), alice).await.unwrap();

        for (operation, revision) in [(&first, 1), (&second, 2)] {
            let Some(ServerMessage::Ack(ack)) = next_message(&mut alice_events, alice) else {
                panic!("Expected an ack");
            };
            assert_eq!(ack.operation_id, operation.id);
            assert_eq!(ack.revision, revision);

            let Some(ServerMessage::Operation(data)) = next_message(&mut bob_events, bob) else {
                panic!("Expected an operation");
            };
            assert_eq!(data.operation.id, operation.id);
            assert_eq!(data.operation.revision, revision - 1);
        }

        assert_eq!(next_message(&mut alice_events, alice), None);
        assert_eq!(next_message(&mut bob_events, bob), None);
    }

    #[tokio::test]
    async fn test_presence_follows_the_last_connection() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let (observer, first_tab, second_tab) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (_, mut events) = registry.join(&join_data(), &user("carol"), observer).await.unwrap();

        registry.join(&join_data(), &user("alice"), first_tab).await.unwrap();
        registry.join(&join_data(), &user("alice"), second_tab).await.unwrap();

        let actions = std::iter::from_fn(|| next_message(&mut events, observer))
            .filter_map(|message| match message {
                ServerMessage::Presence(data) => Some(data.action),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(actions, vec![PresenceAction::Join, PresenceAction::Update]);

        assert!(registry.leave(&room_id, first_tab).await);
        assert_eq!(next_message(&mut events, observer), None);
        assert_eq!(registry.snapshot(&room_id).await.unwrap().users.len(), 2);

        assert!(registry.leave(&room_id, second_tab).await);
        let Some(ServerMessage::Presence(data)) = next_message(&mut events, observer) else {
            panic!("Expected a presence message");
        };
        assert_eq!(data.action, PresenceAction::Leave);
        assert_eq!(data.user.user_id, "alice");

        assert!(!registry.leave(&room_id, second_tab).await);
    }

    #[tokio::test]
    async fn test_full_room_rejects_joins() {
        let registry = registry_with(|config| config.server.max_clients_per_room = 1, None).await;
        registry.join(&join_data(), &user("alice"), Uuid::new_v4()).await.unwrap();

        let result = registry.join(&join_data(), &user("bob"), Uuid::new_v4()).await;

        assert!(matches!(result, Err(RoomError::Full { capacity: 1, .. })));
    }

    #[tokio::test]
    async fn test_cursor_is_relayed_to_others() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mut alice_events) = registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        let (_, mut bob_events) = registry.join(&join_data(), &user("bob"), bob).await.unwrap();
        next_message(&mut alice_events, alice);

        let cursor = CursorData {
            room_id: room_id.clone(),
            cursor_position: collab_ot::Position::new(0, 3),
            selection: None,
            is_typing: true,
        };
        registry
            .update_cursor(&user("alice"), alice, cursor.clone())
            .await
            .unwrap();

        assert_eq!(
            next_message(&mut bob_events, bob),
            Some(ServerMessage::Cursor {
                user_id: "alice".to_owned(),
                data: cursor.clone()
            })
        );
        assert_eq!(next_message(&mut alice_events, alice), None);

        let snapshot = registry.snapshot(&room_id).await.unwrap();
        let presence = snapshot.users.iter().find(|user| user.user_id == "alice").unwrap();
        assert!(presence.is_typing);

        let stranger = registry
            .update_cursor(&user("mallory"), Uuid::new_v4(), cursor)
            .await;
        assert!(matches!(stranger, Err(RoomError::NotMember(_))));
    }

    #[tokio::test]
    async fn test_replace_content_notifies_and_drops_history() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        let (_, mut events) = registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        registry
            .submit_operation(&room_id, insert("alice", 0, 0, "draft", 0), alice)
            .await
            .unwrap();
        next_message(&mut events, alice);

        let revision = registry
            .replace_content("project", "file", "final".to_owned())
            .await
            .unwrap();

        assert_eq!(revision, 2);
        let Some(ServerMessage::FileChange(change)) = next_message(&mut events, alice) else {
            panic!("Expected a file change");
        };
        assert_eq!(change.new_content, "final");
        assert_eq!(change.revision, 2);

        let pending = registry
            .submit_operation(&room_id, insert("alice", 1, 5, "!", 5), alice)
            .await;
        assert!(matches!(pending, Err(RoomError::ReplayGapTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_silent_presence_expires() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        let (_, mut bob_events) = registry.join(&join_data(), &user("bob"), bob).await.unwrap();

        registry
            .remove_expired(Utc::now() + chrono::Duration::seconds(3600))
            .await;

        let actions = std::iter::from_fn(|| next_message(&mut bob_events, bob))
            .filter_map(|message| match message {
                ServerMessage::Presence(data) => Some((data.user.user_id, data.action)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert!(actions.contains(&("alice".to_owned(), PresenceAction::Leave)));

        // Connections keep the room open.
        let snapshot = registry.snapshot(&room_id).await.unwrap();
        assert!(snapshot.users.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_room_is_closed_and_reopened_from_store() {
        let registry = registry_with(|config| config.rooms.room_idle_timeout_seconds = 0, None).await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        registry
            .submit_operation(&room_id, insert("alice", 0, 0, "kept", 0), alice)
            .await
            .unwrap();
        registry.leave(&room_id, alice).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.remove_expired(Utc::now()).await;

        assert!(matches!(
            registry.room(&room_id).await,
            Err(RoomError::NotFound(_))
        ));
        assert_eq!(
            registry.document("project", "file").await.unwrap(),
            StoredDocument {
                content: "kept".to_owned(),
                revision: 1
            }
        );

        let (_, subscription) = registry
            .join(&join_data(), &user("alice"), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(subscription.sync.content, "kept");
        assert_eq!(subscription.sync.revision, 1);
    }

    #[tokio::test]
    async fn test_small_room_does_not_drop_events() {
        let registry = registry_with(|config| config.server.max_clients_per_room = 2, None).await;
        let room_id = join_data().room_id;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mut alice_events) = registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        let (_, mut bob_events) = registry.join(&join_data(), &user("bob"), bob).await.unwrap();

        for revision in 0..5 {
            let operation = insert("alice", revision, 0, "x", revision as usize);
            registry.submit_operation(&room_id, operation, alice).await.unwrap();
        }

        let revisions = std::iter::from_fn(|| next_message(&mut bob_events, bob))
            .filter_map(|message| match message {
                ServerMessage::Operation(data) => Some(data.operation.revision),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(revisions, vec![0, 1, 2, 3, 4]);

        let acks = std::iter::from_fn(|| next_message(&mut alice_events, alice))
            .filter_map(|message| match message {
                ServerMessage::Ack(ack) => Some(ack.revision),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(acks, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_overflowing_operation_is_rejected() {
        let registry = registry().await;
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        registry.join(&join_data(), &user("alice"), alice).await.unwrap();
        registry
            .submit_operation(&room_id, insert("alice", 0, 0, "a", 0), alice)
            .await
            .unwrap();

        let overflowing = Operation::new(
            "alice",
            "file",
            0,
            vec![TextOperation::Retain(usize::MAX), TextOperation::Retain(1)],
        );
        let error = registry
            .submit_operation(&room_id, overflowing, alice)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RoomError::InvalidOperation(collab_ot::OperationError::LengthOverflow)
        ));
        assert_eq!(registry.snapshot(&room_id).await.unwrap().content, "a");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_the_room_unchanged() {
        let store = TestStore {
            read_only: true,
            ..TestStore::default()
        };
        let registry = RoomRegistry::new(&Config::default(), Arc::new(store));
        let room_id = join_data().room_id;
        let alice = Uuid::new_v4();
        let (_, mut events) = registry.join(&join_data(), &user("alice"), alice).await.unwrap();

        let error = registry
            .submit_operation(&room_id, insert("alice", 0, 0, "lost", 0), alice)
            .await
            .unwrap_err();
        assert!(matches!(error, RoomError::Store(_)));
        assert!(error.requires_sync());

        let replaced = registry
            .replace_content("project", "file", "lost too".to_owned())
            .await;
        assert!(matches!(replaced, Err(RoomError::Store(_))));

        let snapshot = registry.snapshot(&room_id).await.unwrap();
        assert_eq!(snapshot.content, "");
        assert_eq!(snapshot.revision, 0);
        assert_eq!(next_message(&mut events, alice), None);
    }

    #[tokio::test]
    async fn test_slow_load_does_not_block_other_rooms() {
        let registry = RoomRegistry::new(&Config::default(), Arc::new(TestStore::default()));
        let open = join_data();
        let slow = JoinData::new("project", "slow");
        registry.join(&open, &user("alice"), Uuid::new_v4()).await.unwrap();

        let (first, second, snapshot) = tokio::join!(
            registry.join(&slow, &user("bob"), Uuid::new_v4()),
            registry.join(&slow, &user("carol"), Uuid::new_v4()),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                tokio::time::timeout(Duration::from_millis(100), registry.snapshot(&open.room_id))
                    .await
            },
        );

        assert!(snapshot.is_ok_and(|snapshot| snapshot.is_ok()));
        let (first, second) = (first.unwrap().0, second.unwrap().0);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.snapshot().await.unwrap().users.len(), 2);
    }
}
