//! Peer session management.
//!
//! Each TCP connection to another instance runs in its own task and is
//! reached through an unbounded command channel. The manager keys sessions
//! by socket address: dialed sessions by the peer's advertised listen
//! address, accepted ones by the remote's source address.

mod info;

pub use info::{Direction, SessionInfo};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_util::codec::Framed;

use racewire_store::{KvBackend, RaceStore};

use crate::config::NetConfig;
use crate::error::{NetError, NetResult};
use crate::hub::ClientHub;
use crate::protocol::{ClientEvent, JsonCodec, PeerMessage};

/// Command sent to a session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Write a message to the peer.
    Send(PeerMessage),
    /// Close the session.
    Disconnect,
}

/// Handle to a live session.
struct SessionHandle {
    info: SessionInfo,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

/// Slot state for an address.
enum SessionSlot {
    /// A dial is in flight. Holding the slot makes concurrent dials to
    /// the same address no-ops.
    Connecting,
    /// The session task is running.
    Live(SessionHandle),
}

/// Manages all peer sessions.
pub struct SessionManager<B: KvBackend> {
    sessions: RwLock<HashMap<SocketAddr, SessionSlot>>,
    store: Arc<RaceStore<B>>,
    hub: Arc<ClientHub>,
    config: Arc<NetConfig>,
}

impl<B: KvBackend + 'static> SessionManager<B> {
    /// Create a new session manager.
    pub fn new(store: Arc<RaceStore<B>>, hub: Arc<ClientHub>, config: Arc<NetConfig>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            hub,
            config,
        }
    }

    /// Check whether an address already has a slot.
    pub async fn is_connected(&self, addr: &SocketAddr) -> bool {
        self.sessions.read().await.contains_key(addr)
    }

    /// Dial a peer and start a session.
    ///
    /// Idempotent: if a slot for the address exists the call returns
    /// without dialing.
    pub async fn connect(self: &Arc<Self>, addr: SocketAddr) -> NetResult<()> {
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&addr) {
                return Ok(());
            }
            sessions.insert(addr, SessionSlot::Connecting);
        }

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.remove(addr).await;
                return Err(e.into());
            }
            Err(_) => {
                self.remove(addr).await;
                return Err(NetError::ConnectionTimeout { addr });
            }
        };

        self.start_session(stream, addr, Direction::Dialed).await
    }

    /// Start a session over an accepted connection.
    pub async fn accept(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr) -> NetResult<()> {
        self.start_session(stream, addr, Direction::Accepted).await
    }

    async fn start_session(
        self: &Arc<Self>,
        stream: TcpStream,
        addr: SocketAddr,
        direction: Direction,
    ) -> NetResult<()> {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let info = SessionInfo::new(addr, direction);

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                addr,
                SessionSlot::Live(SessionHandle {
                    info: info.clone(),
                    command_tx: command_tx.clone(),
                }),
            );
        }

        tracing::info!(session = %info, "Peer session established");

        // The dialing side pulls the remote state right away
        if direction == Direction::Dialed {
            command_tx
                .send(SessionCommand::Send(PeerMessage::request_state()))
                .map_err(|_| NetError::ChannelSend("session command channel closed".into()))?;
        }

        let manager = self.clone();
        tokio::spawn(async move {
            let reason = drive_session(&manager, stream, addr, command_rx).await;
            manager.remove(addr).await;
            tracing::info!(addr = %addr, reason, "Peer session closed");
        });

        Ok(())
    }

    /// Send a message to every live session, pruning dead ones.
    pub async fn broadcast_to_peers(&self, message: PeerMessage) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|addr, slot| match slot {
            SessionSlot::Connecting => true,
            SessionSlot::Live(handle) => {
                match handle.command_tx.send(SessionCommand::Send(message.clone())) {
                    Ok(()) => true,
                    Err(_) => {
                        tracing::debug!(addr = %addr, "Pruning dead session during broadcast");
                        false
                    }
                }
            }
        });
    }

    /// Snapshot of all live sessions.
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .await
            .values()
            .filter_map(|slot| match slot {
                SessionSlot::Live(handle) => Some(handle.info.clone()),
                SessionSlot::Connecting => None,
            })
            .collect()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|slot| matches!(slot, SessionSlot::Live(_)))
            .count()
    }

    /// Ask every session task to close.
    pub async fn shutdown(&self) {
        let sessions = self.sessions.read().await;
        for slot in sessions.values() {
            if let SessionSlot::Live(handle) = slot {
                let _ = handle.command_tx.send(SessionCommand::Disconnect);
            }
        }
    }

    async fn remove(&self, addr: SocketAddr) {
        self.sessions.write().await.remove(&addr);
    }
}

/// Read/write loop for one peer session. Returns the close reason.
async fn drive_session<B: KvBackend + 'static>(
    manager: &SessionManager<B>,
    stream: TcpStream,
    addr: SocketAddr,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
) -> &'static str {
    let mut framed = Framed::new(stream, JsonCodec::<PeerMessage>::new());

    loop {
        tokio::select! {
            incoming = framed.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        if let Err(e) = handle_peer_message(manager, addr, message, &mut framed).await {
                            tracing::warn!(addr = %addr, error = %e, "Peer message handling failed");
                        }
                    }
                    // Malformed payloads are dropped, the session stays up
                    Some(Err(NetError::Serialization(e))) => {
                        tracing::debug!(addr = %addr, error = %e, "Dropped malformed peer message");
                    }
                    Some(Err(e)) => {
                        tracing::debug!(addr = %addr, error = %e, "Peer read error");
                        return "read error";
                    }
                    None => return "connection closed",
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(SessionCommand::Send(message)) => {
                        if framed.send(message).await.is_err() {
                            return "write error";
                        }
                    }
                    Some(SessionCommand::Disconnect) => return "disconnect requested",
                    None => return "command channel closed",
                }
            }
        }
    }
}

async fn handle_peer_message<B: KvBackend + 'static>(
    manager: &SessionManager<B>,
    addr: SocketAddr,
    message: PeerMessage,
    framed: &mut Framed<TcpStream, JsonCodec<PeerMessage>>,
) -> NetResult<()> {
    match message {
        PeerMessage::Request { .. } => {
            let snapshot = manager.store.read_snapshot()?;
            framed.send(PeerMessage::state_update(snapshot)).await?;
        }
        PeerMessage::Update { state, .. } => {
            tracing::debug!(addr = %addr, pilots = state.pilots.len(), "Applying peer state");
            manager.store.apply_peer_snapshot(&state)?;
            let merged = manager.store.read_snapshot()?;
            manager
                .hub
                .broadcast(&ClientEvent::StateUpdate { state: merged })
                .await;
        }
    }
    Ok(())
}
