use anyhow::Context;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::Response,
};
use collab_ot::protocol::ServerMessage;
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{auth::auth, session::Session};
use crate::{
    app_state::AppState,
    config::user_config::User,
    errors::{SyncServerError, client_error, server_error, unauthorized_error},
};

#[derive(Deserialize)]
pub struct WebSocketQueryParams {
    token: Option<String>,
}

/// Authenticates before upgrading, so a bad token never reaches room logic.
pub async fn websocket_handler(
    Query(WebSocketQueryParams { token }): Query<WebSocketQueryParams>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, SyncServerError> {
    let token = token.ok_or_else(|| unauthorized_error(anyhow::anyhow!("Missing token")))?;
    let user = auth(&state, token.trim())?;

    let ws = ws
        .context("Not a websocket upgrade request")
        .map_err(client_error)?;

    Ok(ws.on_upgrade(move |socket| websocket_wrapped(state, socket, user)))
}

async fn websocket_wrapped(state: AppState, stream: WebSocket, user: User) {
    let connection_id = Uuid::new_v4();
    info!("Websocket connection {connection_id} opened by '{}'", user.name);

    let result = websocket(state, stream, connection_id, user).await;

    if let Err(err) = result {
        error!("Websocket connection {connection_id} failed: {err}");
    }

    warn!("Websocket connection {connection_id} closed");
}

async fn websocket(
    state: AppState,
    stream: WebSocket,
    connection_id: Uuid,
    user: User,
) -> Result<(), SyncServerError> {
    let (mut sender, mut receiver) = stream.split();
    let (outgoing, mut queue) =
        mpsc::channel::<ServerMessage>(state.config.server.send_queue_size.max(1));

    let mut session = Session::new(connection_id, user, state.rooms.clone(), outgoing);
    session.send(ServerMessage::Welcome).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            send_message_over_websocket(&message, &mut sender).await?;
        }

        Ok::<(), SyncServerError>(())
    });

    let receive = async {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => session.handle_text(&text).await,
                Ok(Message::Binary(_)) => {
                    warn!("Discarding binary message from '{}'", session.user().name);
                    session
                        .reject_malformed("Binary messages are not supported")
                        .await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(err) => {
                    warn!("Failed to receive from '{}': {err}", session.user().name);
                    break;
                }
            }
        }
    };

    let send_result = tokio::select! {
        () = receive => None,
        result = &mut send_task => Some(result),
    };

    session.close().await;

    let Some(send_result) = send_result else {
        send_task.abort();
        return Ok(());
    };

    send_result
        .context("Websocket send task failed")
        .map_err(server_error)?
}

async fn send_message_over_websocket(
    message: &ServerMessage,
    sender: &mut SplitSink<WebSocket, Message>,
) -> Result<(), SyncServerError> {
    let serialized = message
        .encode()
        .context("Failed to serialize message")
        .map_err(server_error)?;

    sender
        .send(Message::Text(serialized))
        .await
        .context("Failed to send message over websocket")
        .map_err(server_error)
}
