//! Client connection hub.
//!
//! UI clients connect over TCP and receive every event the service emits.
//! The hub serializes each event once and hands the frame to every
//! connection's writer task; a slow or dead client is pruned on the next
//! broadcast rather than stalling the rest.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio_util::codec::FramedRead;

use futures_util::StreamExt;

use racewire_store::{KvBackend, RaceStore};

use crate::error::NetError;
use crate::protocol::messages::{ClientCmd, ClientCommand};
use crate::protocol::{encode_frame, ClientEvent, JsonCodec};

/// Fan-out hub for UI client connections.
pub struct ClientHub {
    clients: RwLock<HashMap<u64, mpsc::UnboundedSender<Bytes>>>,
    next_id: AtomicU64,
}

impl ClientHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection and get its outgoing frame stream.
    pub async fn register(&self) -> (u64, mpsc::UnboundedReceiver<Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.write().await.insert(id, tx);
        (id, rx)
    }

    /// Remove a connection. Safe to call twice.
    pub async fn unregister(&self, id: u64) {
        self.clients.write().await.remove(&id);
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Send an event to every connected client.
    ///
    /// Never fails: a client whose channel is gone is dropped from the
    /// map, and a serialization failure is logged and swallowed since
    /// events are built from already-validated state.
    pub async fn broadcast(&self, event: &ClientEvent) {
        let frame = match encode_frame(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "Failed to encode client event");
                return;
            }
        };

        let mut clients = self.clients.write().await;
        clients.retain(|id, tx| match tx.send(frame.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(client = id, "Pruning disconnected client");
                false
            }
        });
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one client connection to completion.
///
/// Sends `state_init` immediately, then forwards broadcast frames and
/// answers pings. Clients are read-only: anything that is not a valid
/// command frame is dropped.
pub async fn spawn_client_connection<B: KvBackend + 'static>(
    hub: Arc<ClientHub>,
    store: Arc<RaceStore<B>>,
    stream: TcpStream,
    addr: SocketAddr,
) {
    let (id, mut frames_rx) = hub.register().await;
    tracing::info!(client = id, addr = %addr, "Client connected");

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, JsonCodec::<ClientCommand>::new());

    // First frame on every connection is the full state
    let init = match store.read_snapshot() {
        Ok(snapshot) => ClientEvent::StateInit { state: snapshot },
        Err(e) => {
            tracing::error!(client = id, error = %e, "Failed to read snapshot for init");
            hub.unregister(id).await;
            return;
        }
    };
    match encode_frame(&init) {
        Ok(frame) => {
            if write_half.write_all(&frame).await.is_err() {
                hub.unregister(id).await;
                return;
            }
        }
        Err(e) => {
            tracing::error!(client = id, error = %e, "Failed to encode init frame");
            hub.unregister(id).await;
            return;
        }
    }

    let reason = loop {
        tokio::select! {
            frame = frames_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if write_half.write_all(&frame).await.is_err() {
                            break "write error";
                        }
                    }
                    None => break "hub dropped",
                }
            }
            incoming = reader.next() => {
                match incoming {
                    Some(Ok(ClientCommand { cmd: ClientCmd::Ping })) => {
                        let pong = ClientEvent::Pong { ts: Utc::now() };
                        match encode_frame(&pong) {
                            Ok(frame) => {
                                if write_half.write_all(&frame).await.is_err() {
                                    break "write error";
                                }
                            }
                            Err(e) => {
                                tracing::error!(client = id, error = %e, "Failed to encode pong");
                            }
                        }
                    }
                    // Unknown commands are dropped, the connection stays up
                    Some(Err(NetError::Serialization(_))) => {}
                    Some(Err(_)) => break "read error",
                    None => break "connection closed",
                }
            }
        }
    };

    hub.unregister(id).await;
    tracing::info!(client = id, addr = %addr, reason, "Client disconnected");
}
