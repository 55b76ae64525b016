//! WebSocket connection management
//!
//! Owns the lifecycle of the single connection to the room server: connect,
//! disconnect, the outbound send primitive, and the inbound pipeline that
//! classifies frames and maintains the session room snapshot.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::classifier::classify;
use super::protocol::{
    describe_close, ConnectionState, DisplayMessage, InboundMessage, MessageCategory,
    OutboundRequest, RoomSnapshot, CLOSE_ABNORMAL, CLOSE_NORMAL,
};

/// Detail attached to transport errors; raw transport internals are not
/// assumed to be meaningful to the operator.
const TRANSPORT_ERROR_HINT: &str = "Make sure the server is running and the token is valid.";

/// Errors that can occur during connection operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not connected! Please connect first.")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,
}

/// Result type for connection operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Manages the single WebSocket connection to the room server
///
/// All observable output flows through the display-message feed returned by
/// [`ConnectionManager::new`] and the session room snapshot. Transport
/// failures are reported on the feed and never propagate; only validation
/// and not-connected failures are returned to the caller.
pub struct ConnectionManager {
    /// Connection lifecycle state, published to subscribers
    state: Arc<watch::Sender<ConnectionState>>,
    /// Current room, derived from responses and broadcasts
    room: Arc<RwLock<Option<RoomSnapshot>>>,
    /// Display-message feed consumed by the console
    events: mpsc::UnboundedSender<DisplayMessage>,
    /// Outbound channel into the transport task (present while connected)
    outbound: Arc<RwLock<Option<mpsc::UnboundedSender<Message>>>>,
    /// Shutdown signal for the transport task
    shutdown: broadcast::Sender<()>,
}

impl ConnectionManager {
    /// Create a new manager together with its display-message feed
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayMessage>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = broadcast::channel(1);

        let manager = Self {
            state: Arc::new(state),
            room: Arc::new(RwLock::new(None)),
            events,
            outbound: Arc::new(RwLock::new(None)),
            shutdown,
        };
        (manager, events_rx)
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Get the current room snapshot, if any
    pub async fn room(&self) -> Option<RoomSnapshot> {
        self.room.read().await.clone()
    }

    /// Open the WebSocket connection
    ///
    /// The token is appended to the URL as a `token=` query parameter. A
    /// handshake failure is reported on the feed and leaves the manager
    /// `Disconnected`; no retry is attempted.
    pub async fn connect(&self, server_url: &str, token: &str) -> ClientResult<()> {
        if token.is_empty() {
            return Err(ClientError::Validation(
                "Please enter a JWT token".to_string(),
            ));
        }
        if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
            return Err(ClientError::Validation(
                "Server URL must start with ws:// or wss://".to_string(),
            ));
        }
        if self.state() != ConnectionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }

        self.state.send_replace(ConnectionState::Connecting);
        self.emit(DisplayMessage::system(format!(
            "Attempting to connect to {}",
            server_url
        )));

        // The token itself stays out of the logs
        debug!("Connecting to {}", server_url);
        let url = url_with_token(server_url, token);

        // Subscribe before the handshake so a disconnect issued while the
        // attempt is in flight still reaches the transport task.
        let shutdown = self.shutdown.subscribe();

        let ws = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                error!("WebSocket handshake failed: {}", e);
                self.state.send_replace(ConnectionState::Disconnected);
                self.emit(DisplayMessage::error_with_details(
                    "WebSocket error occurred",
                    TRANSPORT_ERROR_HINT,
                ));
                return Ok(());
            }
        };

        self.state.send_replace(ConnectionState::Connected);
        self.emit(DisplayMessage::system(
            "Successfully connected to WebSocket server",
        ));
        info!("Connected to {}", server_url);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        *self.outbound.write().await = Some(out_tx);

        let task = TransportTask {
            state: Arc::clone(&self.state),
            room: Arc::clone(&self.room),
            events: self.events.clone(),
            outbound: Arc::clone(&self.outbound),
            shutdown,
        };
        tokio::spawn(task.run(ws, out_rx));

        Ok(())
    }

    /// Close the connection
    ///
    /// Idempotent: disconnecting while already disconnected is a no-op. The
    /// transport task sends a protocol close and releases the socket.
    pub fn disconnect(&self) {
        // No receiver means no transport task is running
        let _ = self.shutdown.send(());
    }

    /// Send a structured request to the server
    ///
    /// With `auto_tag` set, a request without an identity key is tagged with
    /// a generated one before transmission; a caller-supplied key is never
    /// overwritten. The transmitted request is echoed on the feed as a Sent
    /// message so the operator can see the assigned key.
    pub async fn send(&self, mut request: OutboundRequest, auto_tag: bool) -> ClientResult<()> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }

        if auto_tag {
            request.tag_identity_key();
        }

        let content = match serde_json::to_value(&request) {
            Ok(content) => content,
            Err(e) => {
                // Reported on the feed, never propagated
                self.emit(DisplayMessage::error(format!(
                    "Failed to serialize request: {}",
                    e
                )));
                return Ok(());
            }
        };

        let outbound = self.outbound.read().await;
        match outbound.as_ref() {
            Some(tx) if tx.send(Message::Text(content.to_string())).is_ok() => {
                drop(outbound);
                debug!("Sent {} request", request.event);
                self.emit(DisplayMessage::new(MessageCategory::Sent, content));
                Ok(())
            }
            _ => Err(ClientError::NotConnected),
        }
    }

    fn emit(&self, message: DisplayMessage) {
        let _ = self.events.send(message);
    }
}

/// Append the token as a URL-encoded query parameter
fn url_with_token(server_url: &str, token: &str) -> String {
    let separator = if server_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}token={}",
        server_url,
        separator,
        urlencoding::encode(token)
    )
}

/// Background task owning the socket for one connection's lifetime
///
/// Sole reader and writer of the transport. Frames are handled in arrival
/// order; each frame's classification and state update completes before the
/// next frame is read.
struct TransportTask {
    state: Arc<watch::Sender<ConnectionState>>,
    room: Arc<RwLock<Option<RoomSnapshot>>>,
    events: mpsc::UnboundedSender<DisplayMessage>,
    outbound: Arc<RwLock<Option<mpsc::UnboundedSender<Message>>>>,
    shutdown: broadcast::Receiver<()>,
}

impl TransportTask {
    async fn run(
        mut self,
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        mut out_rx: mpsc::UnboundedReceiver<Message>,
    ) {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                // Operator-initiated disconnect
                _ = self.shutdown.recv() => {
                    let _ = sink.send(Message::Close(None)).await;
                    info!("Connection closed by operator");
                    self.emit(DisplayMessage::system_with_code(
                        describe_close(CLOSE_NORMAL, ""),
                        CLOSE_NORMAL,
                    ));
                    break;
                }
                // Outbound traffic from send()
                outgoing = out_rx.recv() => {
                    match outgoing {
                        Some(message) => {
                            if let Err(e) = sink.send(message).await {
                                error!("Failed to transmit: {}", e);
                                self.report_abnormal_closure();
                                break;
                            }
                        }
                        // Manager dropped; nothing left to serve
                        None => break,
                    }
                }
                // Inbound frames
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text).await;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            warn!("Received binary frame ({} bytes), ignoring", data.len());
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            // Ignore pong frames
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = match frame {
                                Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
                                None => (CLOSE_NORMAL, String::new()),
                            };
                            info!("Server closed the connection (code {})", code);
                            self.emit(DisplayMessage::system_with_code(
                                describe_close(code, &reason),
                                code,
                            ));
                            break;
                        }
                        Some(Ok(Message::Frame(_))) => {
                            // Raw frame, ignore
                        }
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            self.report_abnormal_closure();
                            break;
                        }
                        None => {
                            error!("Connection dropped without a close frame");
                            self.report_abnormal_closure();
                            break;
                        }
                    }
                }
            }
        }

        // Release the transport and reset the session; the snapshot is
        // scoped to the connection.
        *self.outbound.write().await = None;
        *self.room.write().await = None;
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Decode, classify, apply the implied state update, and emit
    ///
    /// A malformed frame degrades to a raw-text Received message; it never
    /// breaks the pipeline for subsequent frames.
    async fn handle_text(&self, text: &str) {
        debug!("Received frame: {}", text);

        let message = InboundMessage::parse(text);
        let classification = classify(&message);

        if let Some(update) = classification.update {
            let mut room = self.room.write().await;
            update.apply(&mut room);
        }

        self.emit(DisplayMessage::new(
            classification.category,
            message.display_content(),
        ));
    }

    /// Abnormal termination: a generic error followed by the 1006 close note
    fn report_abnormal_closure(&self) {
        self.emit(DisplayMessage::error_with_details(
            "WebSocket error occurred",
            TRANSPORT_ERROR_HINT,
        ));
        self.emit(DisplayMessage::system_with_code(
            describe_close(CLOSE_ABNORMAL, ""),
            CLOSE_ABNORMAL,
        ));
    }

    fn emit(&self, message: DisplayMessage) {
        let _ = self.events.send(message);
    }
}
