//! Connection handle: transport tasks plus the session event loop.
//!
//! A [`Connection`] owns a writer task that serializes [`Request`]s and a
//! reader task that forwards every inbound text message as a
//! [`ConnectionEvent`]. [`run_session`] is the single place where inbound
//! messages and user commands meet the [`Session`]; it handles one event at
//! a time so handlers never interleave.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::codec::{MessageReader, MessageWriter};
use crate::protocol::Request;
use crate::session::{Session, SessionError};
use crate::types::{CloseReason, Command, ConnectionEvent, SessionEnd};

const EVENT_CHANNEL_CAPACITY: usize = 256;

const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

pub struct Connection {
    outgoing: mpsc::UnboundedSender<Request>,
    events: mpsc::Receiver<ConnectionEvent>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl Connection {
    /// Run the protocol over a byte stream with newline-delimited messages.
    pub fn spawn<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Request>();
        let (event_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let writer_event_tx = event_tx.clone();
        let writer_handle = tokio::spawn(async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(request) = outgoing_rx.recv().await {
                let result = match request.to_text() {
                    Ok(text) => writer.write_message(&text).await,
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = result {
                    tracing::warn!("Trace backend write error: {e:#}");
                    let _ = writer_event_tx
                        .send(ConnectionEvent::Closed(CloseReason::Failed(e.to_string())))
                        .await;
                    break;
                }
            }
        });

        let reader_handle = tokio::spawn(async move {
            let mut reader = MessageReader::new(reader);
            loop {
                match reader.read_message().await {
                    Ok(Some(text)) => {
                        if event_tx.send(ConnectionEvent::Message(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Trace backend closed the stream");
                        let _ = event_tx
                            .send(ConnectionEvent::Closed(CloseReason::Remote))
                            .await;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Trace backend read error: {e:#}");
                        let _ = event_tx
                            .send(ConnectionEvent::Closed(CloseReason::Failed(e.to_string())))
                            .await;
                        break;
                    }
                }
            }
        });

        Self {
            outgoing,
            events,
            reader_handle,
            writer_handle,
        }
    }

    /// Connect to a websocket endpoint; each text frame is one message.
    pub async fn websocket(url: &str) -> Result<Self> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        tracing::info!("Connected to trace backend at {url}");
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Request>();
        let (event_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let writer_event_tx = event_tx.clone();
        let writer_handle = tokio::spawn(async move {
            while let Some(request) = outgoing_rx.recv().await {
                let text = match request.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("Failed to serialize {} request: {e}", request.kind());
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    tracing::warn!("Trace backend write error: {e}");
                    let _ = writer_event_tx
                        .send(ConnectionEvent::Closed(CloseReason::Failed(e.to_string())))
                        .await;
                    return;
                }
            }
            let _ = sink.close().await;
        });

        let reader_handle = tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(WsMessage::Text(text))) => {
                        if event_tx.send(ConnectionEvent::Message(text)).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break CloseReason::Remote,
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        tracing::debug!("Ignoring {} byte binary frame", bytes.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break CloseReason::Failed(e.to_string()),
                }
            };
            tracing::info!("Trace backend connection {reason}");
            let _ = event_tx.send(ConnectionEvent::Closed(reason)).await;
        });

        Ok(Self {
            outgoing,
            events,
            reader_handle,
            writer_handle,
        })
    }

    /// A fresh session whose requests go out over this connection.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.outgoing.clone())
    }

    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Stop both tasks. Requests already queued are flushed first, within a
    /// short grace period.
    pub async fn shutdown(self) {
        let Self {
            outgoing,
            events,
            reader_handle,
            mut writer_handle,
        } = self;
        drop(outgoing);
        drop(events);
        match tokio::time::timeout(
            Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
            &mut writer_handle,
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Trace backend writer task failed: {e}"),
            Err(_) => {
                tracing::debug!("Trace backend writer didn't finish in time, aborting");
                writer_handle.abort();
            }
        }
        reader_handle.abort();
    }
}

/// Drive `session` until the user quits or the backend goes away.
///
/// Sends the initial `RootTraces` request, then applies connection events and
/// user commands strictly one at a time. `after_event` runs after each one,
/// with the session in a committed state. The session and the connection are
/// torn down before returning.
pub async fn run_session<F>(
    mut connection: Connection,
    mut session: Session,
    mut commands: mpsc::Receiver<Command>,
    mut after_event: F,
) -> SessionEnd
where
    F: FnMut(&mut Session),
{
    let end = match session.start() {
        Ok(()) => drive(&mut connection, &mut session, &mut commands, &mut after_event).await,
        Err(e) => {
            tracing::error!("Failed to request root traces: {e}");
            SessionEnd::Disconnected(CloseReason::Failed(e.to_string()))
        }
    };
    session.close();
    connection.shutdown().await;
    end
}

async fn drive<F>(
    connection: &mut Connection,
    session: &mut Session,
    commands: &mut mpsc::Receiver<Command>,
    after_event: &mut F,
) -> SessionEnd
where
    F: FnMut(&mut Session),
{
    loop {
        tokio::select! {
            event = connection.next_event() => match event {
                Some(ConnectionEvent::Message(text)) => {
                    session.handle_message(&text);
                }
                Some(ConnectionEvent::Closed(reason)) => {
                    return SessionEnd::Disconnected(reason);
                }
                None => return SessionEnd::Disconnected(CloseReason::Remote),
            },
            command = commands.recv() => match command {
                Some(Command::Quit) | None => return SessionEnd::Quit,
                Some(command) => {
                    if let Err(e) = apply_command(session, command) {
                        tracing::warn!("Command {command:?} failed: {e}");
                    }
                }
            },
        }
        after_event(session);
    }
}

fn apply_command(session: &mut Session, command: Command) -> Result<(), SessionError> {
    match command {
        Command::Move(direction) => session.move_in(direction),
        Command::ToggleActive => match session.active_id() {
            Some(id) => session.toggle_expansion(id).map(drop),
            None => Ok(()),
        },
        Command::ToggleExpansion(id) => session.toggle_expansion(id).map(drop),
        Command::Activate(id) => session.activate(id),
        Command::Quit => Ok(()),
    }
}
