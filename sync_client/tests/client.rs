use std::time::Duration;

use collab_ot::protocol::{ClientMessage, RoomId, ServerMessage, SyncData};
use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use sync_client::{ClientConfig, ClientEvent, CollabClient, ConnectionState};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::UnboundedReceiver,
};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

const TIMEOUT: Duration = Duration::from_secs(5);

type ServerSocket = WebSocketStream<TcpStream>;

/// A local listener standing in for the server, scripted by each test.
async fn listen(initial_backoff: Duration) -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let mut config = ClientConfig::new(format!("ws://{address}"), "token", "alice");
    config.initial_backoff = initial_backoff;
    config.max_backoff = initial_backoff;

    (listener, config)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = tokio::time::timeout(TIMEOUT, listener.accept())
        .await
        .expect("Timed out waiting for the client to connect")
        .unwrap();

    accept_async(stream).await.unwrap()
}

/// Next message from the client, carets aside.
async fn receive(socket: &mut ServerSocket) -> ClientMessage {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    let message = ClientMessage::decode(&text).unwrap();
                    if !matches!(message, ClientMessage::Cursor(_)) {
                        return message;
                    }
                }
                Some(Ok(_)) => {}
                other => panic!("Connection ended: {other:?}"),
            }
        }
    })
    .await
    .expect("Timed out waiting for a message")
}

async fn send_sync(socket: &mut ServerSocket, content: &str, revision: u64) {
    let message = ServerMessage::Sync(SyncData {
        room_id: room_id(),
        content: content.to_owned(),
        revision,
        users: vec![],
    });

    socket
        .send(Message::Text(message.encode().unwrap()))
        .await
        .unwrap();
}

async fn wait_for(
    events: &mut UnboundedReceiver<ClientEvent>,
    expected: impl Fn(&ClientEvent) -> bool,
) -> ClientEvent {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("Client stopped");
            if expected(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Timed out waiting for an event")
}

fn room_id() -> RoomId { RoomId::new("project", "notes") }

async fn join(listener: &TcpListener, content: &str, revision: u64) -> ServerSocket {
    let mut socket = accept(listener).await;

    let ClientMessage::Join(join) = receive(&mut socket).await else {
        panic!("Expected a join");
    };
    assert_eq!(join.room_id, room_id());

    send_sync(&mut socket, content, revision).await;
    socket
}

#[tokio::test]
async fn test_rejoins_and_adopts_the_snapshot_after_the_connection_drops() {
    let (listener, config) = listen(Duration::from_millis(20)).await;
    let (client, mut events) = CollabClient::connect(config, "project", "notes");

    let socket = join(&listener, "hello", 3).await;
    wait_for(&mut events, |event| {
        matches!(event, ClientEvent::Synced { revision: 3, .. })
    })
    .await;

    drop(socket);
    wait_for(&mut events, |event| {
        event == &ClientEvent::ConnectionChanged(ConnectionState::Reconnecting)
    })
    .await;

    let mut socket = join(&listener, "hello world", 5).await;
    wait_for(&mut events, |event| {
        matches!(event, ClientEvent::ContentChanged { content, .. } if content == "hello world")
    })
    .await;

    client.edit("hello world!").unwrap();
    let ClientMessage::Operation(data) = receive(&mut socket).await else {
        panic!("Expected an operation");
    };
    assert_eq!(data.operation.revision, 5);
    assert_eq!(data.operation.author_id, "alice");
    assert_eq!(data.operation.apply("hello world").unwrap(), "hello world!");

    tokio::time::timeout(TIMEOUT, client.disconnect())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(receive(&mut socket).await, ClientMessage::Leave(_)));
}

#[tokio::test]
async fn test_edits_while_reconnecting_stay_local() {
    let (listener, config) = listen(Duration::from_millis(300)).await;
    let (client, mut events) = CollabClient::connect(config, "project", "notes");

    let socket = join(&listener, "draft", 1).await;
    wait_for(&mut events, |event| {
        matches!(event, ClientEvent::Synced { revision: 1, .. })
    })
    .await;

    drop(socket);
    wait_for(&mut events, |event| {
        event == &ClientEvent::ConnectionChanged(ConnectionState::Reconnecting)
    })
    .await;
    client.edit("draft, offline").unwrap();

    // The join is the first thing the new connection carries.
    let mut socket = join(&listener, "final draft", 2).await;
    wait_for(&mut events, |event| {
        matches!(event, ClientEvent::ContentChanged { content, .. } if content == "final draft")
    })
    .await;

    client.edit("final draft!").unwrap();
    let ClientMessage::Operation(data) = receive(&mut socket).await else {
        panic!("Expected an operation");
    };
    assert_eq!(data.operation.revision, 2);
    assert_eq!(data.operation.apply("final draft").unwrap(), "final draft!");
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let (listener, mut config) = listen(Duration::from_millis(10)).await;
    config.max_retries = 3;
    drop(listener);

    let (_client, mut events) = CollabClient::connect(config, "project", "notes");

    let unavailable = wait_for(&mut events, |event| {
        matches!(event, ClientEvent::Unavailable { .. })
    })
    .await;
    assert_eq!(unavailable, ClientEvent::Unavailable { attempts: 3 });

    wait_for(&mut events, |event| {
        event == &ClientEvent::ConnectionChanged(ConnectionState::Disconnected)
    })
    .await;
}
