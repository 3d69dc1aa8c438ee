use std::time::{Duration, Instant};

use collab_ot::{Selection, protocol::ServerMessage};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use log::{debug, error, info, warn};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::{
    backoff::Backoff,
    config::ClientConfig,
    connection::{ConnectionState, ConnectionTrigger},
    errors::ClientError,
    events::ClientEvent,
    reconciler::{Output, Reconciler},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const MIN_TICK: Duration = Duration::from_millis(50);

#[derive(Debug)]
enum Command {
    Edit(String),
    Select(Selection),
    Sync,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Reconnect,
    Stop,
}

/// Handle to a background task keeping one file in sync with the server.
///
/// The task reconnects on its own; everything it has to tell the embedding
/// editor arrives on the event receiver returned by `connect`.
#[derive(Debug)]
pub struct CollabClient {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl CollabClient {
    pub fn connect(
        config: ClientConfig,
        project_id: &str,
        file_id: &str,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (commands, command_receiver) = mpsc::unbounded_channel();
        let (events, event_receiver) = mpsc::unbounded_channel();

        let driver = Driver {
            reconciler: Reconciler::new(&config, project_id, file_id),
            backoff: Backoff::new(config.initial_backoff, config.max_backoff),
            state: ConnectionState::Disconnected,
            config,
            commands: command_receiver,
            events,
        };

        let task = tokio::spawn(driver.run());

        (Self { commands, task }, event_receiver)
    }

    /// Reports the editor's full new content.
    pub fn edit(&self, content: impl Into<String>) -> Result<(), ClientError> {
        self.command(Command::Edit(content.into()))
    }

    pub fn set_selection(&self, selection: Selection) -> Result<(), ClientError> {
        self.command(Command::Select(selection))
    }

    pub fn request_sync(&self) -> Result<(), ClientError> { self.command(Command::Sync) }

    /// Leaves the room and waits for the connection to close.
    pub async fn disconnect(self) -> Result<(), ClientError> {
        self.command(Command::Disconnect)?;

        self.task.await.map_err(|err| {
            error!("Client task failed: {err}");
            ClientError::Closed
        })
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).map_err(|_| ClientError::Closed)
    }
}

#[derive(Debug)]
struct Driver {
    config: ClientConfig,
    reconciler: Reconciler,
    backoff: Backoff,
    state: ConnectionState,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            self.transition(ConnectionTrigger::Connect);

            match connect_async(self.config.websocket_url()).await {
                Ok((socket, _)) => {
                    info!("Connected to {}", self.config.server_url);
                    self.transition(ConnectionTrigger::Established);
                    self.backoff.reset();

                    if self.serve(socket).await == Flow::Stop {
                        break;
                    }
                }
                Err(err) => warn!("Failed to connect to {}: {err}", self.config.server_url),
            }

            self.reconciler.on_disconnected();
            self.transition(ConnectionTrigger::Lost);

            if self.backoff.attempts() >= self.config.max_retries {
                error!(
                    "Giving up on {} after {} attempts",
                    self.config.server_url,
                    self.backoff.attempts()
                );
                self.emit(ClientEvent::Unavailable {
                    attempts: self.backoff.attempts(),
                });
                break;
            }

            let delay = self.backoff.next_delay();
            debug!("Reconnecting in {delay:?}");

            if self.wait(delay).await == Flow::Stop {
                break;
            }
        }

        self.reconciler.on_disconnected();
        self.transition(ConnectionTrigger::Disconnect);
    }

    async fn serve(&mut self, socket: Socket) -> Flow {
        let (mut sink, mut source) = socket.split();
        let mut ticker = tokio::time::interval((self.config.typing_timeout / 2).max(MIN_TICK));

        let output = self.reconciler.on_connected();
        if let Err(err) = self.transmit(&mut sink, output).await {
            warn!("Failed to join: {err}");
            return Flow::Reconnect;
        }

        loop {
            let output = tokio::select! {
                message = source.next() => match message {
                    Some(Ok(Message::Text(text))) => match ServerMessage::decode(&text) {
                        Ok(message) => self.reconciler.handle(message),
                        Err(err) => {
                            warn!("Discarding malformed message: {err}");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        return Flow::Reconnect;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        warn!("Connection lost: {err}");
                        return Flow::Reconnect;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) | None => {
                        let output = self.reconciler.leave();
                        if let Err(err) = self.transmit(&mut sink, output).await {
                            debug!("Failed to leave cleanly: {err}");
                        }
                        if let Err(err) = sink.close().await {
                            debug!("Failed to close the connection: {err}");
                        }

                        return Flow::Stop;
                    }
                    Some(command) => self.apply(command),
                },
                _ = ticker.tick() => self.reconciler.tick(Instant::now()),
            };

            if let Err(err) = self.transmit(&mut sink, output).await {
                warn!("Connection lost while sending: {err}");
                return Flow::Reconnect;
            }
        }
    }

    /// Sleeps before the next attempt. Edits made meanwhile stay local until
    /// the snapshot after rejoining replaces them.
    async fn wait(&mut self, delay: Duration) -> Flow {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return Flow::Reconnect,
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) | None => return Flow::Stop,
                    Some(command) => {
                        let output = self.apply(command);
                        self.emit_all(output.events);
                    }
                },
            }
        }
    }

    fn apply(&mut self, command: Command) -> Output {
        match command {
            Command::Edit(content) => self.reconciler.local_change(&content, Instant::now()),
            Command::Select(selection) => self.reconciler.set_selection(selection),
            Command::Sync => self.reconciler.request_sync(),
            Command::Disconnect => self.reconciler.leave(),
        }
    }

    async fn transmit(
        &self,
        sink: &mut SplitSink<Socket, Message>,
        output: Output,
    ) -> Result<(), ClientError> {
        self.emit_all(output.events);

        for message in output.messages {
            let text = message.encode(Some(self.config.user_id.clone()))?;
            sink.send(Message::Text(text)).await?;
        }

        Ok(())
    }

    fn transition(&mut self, trigger: ConnectionTrigger) {
        let Some(next) = self.state.next(trigger) else {
            debug!("Ignoring {trigger:?} while {:?}", self.state);
            return;
        };

        if next != self.state {
            self.state = next;
            self.emit(ClientEvent::ConnectionChanged(next));
        }
    }

    fn emit_all(&self, events: Vec<ClientEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn emit(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            debug!("Nobody is listening to client events");
        }
    }
}
