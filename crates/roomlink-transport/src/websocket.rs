//! WebSocket client transport using `tokio-tungstenite`.
//!
//! One background task owns the socket. Emits are encoded on the caller's
//! side and queued on an unbounded channel; the task writes them out and
//! dispatches every inbound frame to the [`ListenerMap`]. When the link
//! drops, the task fires `disconnect`, reconnects per [`ReconnectConfig`],
//! and fires `reconnection` + `connect` once the link is back. Frames emitted
//! in between stay queued and go out after the reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use roomlink_protocol::events::{CONNECT, DISCONNECT, RECONNECTION};
use roomlink_protocol::{Codec, EventFrame, JsonCodec, Payload, ProtocolError};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connect, ConnectOptions, ConnectionId, EventTransport, Listener,
    ListenerMap, ReconnectConfig, TransportError,
};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Work for the socket task.
enum Outbound {
    Frame(String),
    Close,
}

/// How one link ended.
enum LinkEnd {
    /// The client asked to close.
    Shutdown,
    /// The server or the network dropped us.
    Lost,
}

/// State shared between the handle and the socket task.
struct Shared {
    id: ConnectionId,
    listeners: ListenerMap,
    options: Mutex<ConnectOptions>,
    closed: AtomicBool,
    codec: JsonCodec,
}

impl Shared {
    fn options(&self) -> MutexGuard<'_, ConnectOptions> {
        self.options.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A WebSocket connection to a room server.
///
/// Frames are JSON text messages of the form `{"event": ..., "data": ...}`.
pub struct WebSocketTransport {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Connect for WebSocketTransport {
    async fn connect(options: ConnectOptions) -> Result<Self, TransportError> {
        let url = options.endpoint()?;
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let shared = Arc::new(Shared {
            id: ConnectionId::next(),
            listeners: ListenerMap::new(),
            options: Mutex::new(options),
            closed: AtomicBool::new(false),
            codec: JsonCodec,
        });
        tracing::info!(id = %shared.id, url = %url.origin().ascii_serialization(), "WebSocket connected");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(ws, rx, Arc::clone(&shared)));

        Ok(Self {
            shared,
            outbound: tx,
        })
    }
}

impl EventTransport for WebSocketTransport {
    fn emit(&self, event: &str, payload: Payload) -> Result<(), TransportError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let bytes = self.shared.codec.encode(&EventFrame::new(event, payload))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            ProtocolError::InvalidFrame(format!("frame is not UTF-8: {e}"))
        })?;
        self.outbound
            .send(Outbound::Frame(text))
            .map_err(|_| TransportError::Closed)
    }

    fn on(&self, event: &str, listener: Listener) {
        self.shared.listeners.add(event, listener);
    }

    fn off(&self, event: &str, listener: &Listener) {
        self.shared.listeners.remove(event, listener);
    }

    fn listener_count(&self, event: &str) -> usize {
        self.shared.listeners.count(event)
    }

    fn set_connect_param(&self, key: &str, value: &str) {
        self.shared.options().set_param(key, value);
    }

    fn id(&self) -> ConnectionId {
        self.shared.id
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // The task may already be gone (reconnect gave up); that's closed too.
        let _ = self.outbound.send(Outbound::Close);
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Socket task: pump the current link, reconnect when it drops.
async fn run_socket(
    mut ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
) {
    loop {
        match pump(&mut ws, &mut outbound, &shared).await {
            LinkEnd::Shutdown => break,
            LinkEnd::Lost => {}
        }

        tracing::info!(id = %shared.id, "link lost");
        shared.listeners.dispatch(DISCONNECT, &Payload::Null);

        match reconnect(&shared).await {
            Some(fresh) => {
                ws = fresh;
                tracing::info!(id = %shared.id, "link re-established");
                shared.listeners.dispatch(RECONNECTION, &Payload::Null);
                shared.listeners.dispatch(CONNECT, &Payload::Null);
            }
            None => break,
        }
    }

    shared.closed.store(true, Ordering::SeqCst);
    tracing::debug!(id = %shared.id, "socket task finished");
}

/// Moves frames both ways until the link ends.
async fn pump(
    ws: &mut WsStream,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    shared: &Shared,
) -> LinkEnd {
    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = ws.send(Message::Text(text.into())).await {
                        tracing::debug!(id = %shared.id, error = %e, "send failed");
                        return LinkEnd::Lost;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = ws.close(None).await;
                    return LinkEnd::Shutdown;
                }
            },
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_inbound(shared, text.as_bytes()),
                Some(Ok(Message::Binary(data))) => handle_inbound(shared, &data),
                Some(Ok(Message::Close(_))) | None => return LinkEnd::Lost,
                Some(Ok(_)) => {} // ping/pong/raw frame
                Some(Err(e)) => {
                    tracing::debug!(id = %shared.id, error = %e, "receive failed");
                    return LinkEnd::Lost;
                }
            },
        }
    }
}

fn handle_inbound(shared: &Shared, data: &[u8]) {
    match shared.codec.decode(data) {
        Ok(frame) => {
            let ran = shared.listeners.dispatch(&frame.event, &frame.data);
            tracing::trace!(id = %shared.id, event = %frame.event, listeners = ran, "inbound event");
        }
        Err(e) => {
            tracing::warn!(id = %shared.id, error = %e, "dropping undecodable frame");
        }
    }
}

/// Retries the connection per the reconnect policy.
///
/// Returns `None` if reconnection is disabled, the attempts ran out, or the
/// client closed the transport meanwhile.
async fn reconnect(shared: &Shared) -> Option<WsStream> {
    let policy = shared.options().reconnect.clone();
    if !policy.enabled {
        return None;
    }

    let mut attempt: u32 = 0;
    loop {
        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            tracing::warn!(id = %shared.id, attempts = attempt, "giving up reconnecting");
            return None;
        }
        attempt += 1;

        tokio::time::sleep(backoff(&policy)).await;
        if shared.closed.load(Ordering::SeqCst) {
            return None;
        }

        // Params are re-read every attempt: the session layer may have
        // swapped in a fresh resumption token since the last one.
        let url = match shared.options().endpoint() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(id = %shared.id, error = %e, "reconnect url invalid");
                return None;
            }
        };
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _)) => return Some(ws),
            Err(e) => {
                tracing::debug!(id = %shared.id, attempt, error = %e, "reconnect attempt failed");
            }
        }
    }
}

/// Base delay plus uniform jitter in `0..=max_jitter`.
fn backoff(policy: &ReconnectConfig) -> Duration {
    let max_us = u64::try_from(policy.max_jitter.as_micros()).unwrap_or(u64::MAX);
    let jitter_us = if max_us == 0 {
        0
    } else {
        rand::rng().random_range(0..=max_us)
    };
    policy.delay + Duration::from_micros(jitter_us)
}
