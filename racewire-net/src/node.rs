//! Main networking node orchestrator.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};

use racewire_store::{KvBackend, RaceStore};

use crate::config::NetConfig;
use crate::discovery::{local_ip, run_announcer, run_listener};
use crate::dispatch::MutationDispatcher;
use crate::error::NetResult;
use crate::hub::{spawn_client_connection, ClientHub};
use crate::session::SessionManager;

/// The networking node.
///
/// Owns the peer and client listeners, the discovery tasks, and the
/// select loop driving them. Mutation sources hold the dispatcher and the
/// shutdown handle; `run` consumes the node.
pub struct NetNode<B: KvBackend> {
    config: Arc<NetConfig>,
    store: Arc<RaceStore<B>>,
    sessions: Arc<SessionManager<B>>,
    hub: Arc<ClientHub>,
    dispatcher: Arc<MutationDispatcher<B>>,
    shutdown_tx: broadcast::Sender<()>,
    /// Channel to send the bound peer address when the node starts.
    peer_addr_tx: Option<oneshot::Sender<SocketAddr>>,
    /// Channel to send the bound client address when the node starts.
    client_addr_tx: Option<oneshot::Sender<SocketAddr>>,
}

impl<B: KvBackend + 'static> NetNode<B> {
    /// Create a node over the given store.
    pub fn new(config: NetConfig, store: Arc<RaceStore<B>>) -> Self {
        let config = Arc::new(config);
        let hub = Arc::new(ClientHub::new());
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            hub.clone(),
            config.clone(),
        ));
        let dispatcher = Arc::new(MutationDispatcher::new(
            store.clone(),
            sessions.clone(),
            hub.clone(),
        ));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            sessions,
            hub,
            dispatcher,
            shutdown_tx,
            peer_addr_tx: None,
            client_addr_tx: None,
        }
    }

    /// The mutation dispatcher.
    pub fn dispatcher(&self) -> Arc<MutationDispatcher<B>> {
        self.dispatcher.clone()
    }

    /// The session manager.
    pub fn sessions(&self) -> Arc<SessionManager<B>> {
        self.sessions.clone()
    }

    /// The client hub.
    pub fn hub(&self) -> Arc<ClientHub> {
        self.hub.clone()
    }

    /// A handle that stops the node when signalled.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Get a oneshot receiver for the bound peer listener address.
    /// Useful for tests binding port 0.
    pub fn peer_addr_receiver(&mut self) -> oneshot::Receiver<SocketAddr> {
        let (tx, rx) = oneshot::channel();
        self.peer_addr_tx = Some(tx);
        rx
    }

    /// Get a oneshot receiver for the bound client listener address.
    pub fn client_addr_receiver(&mut self) -> oneshot::Receiver<SocketAddr> {
        let (tx, rx) = oneshot::channel();
        self.client_addr_tx = Some(tx);
        rx
    }

    /// Run the node until shutdown.
    pub async fn run(mut self) -> NetResult<()> {
        let peer_listener = TcpListener::bind(self.config.peer_addr).await?;
        let peer_addr = peer_listener.local_addr()?;
        tracing::info!(addr = %peer_addr, "Peer listener bound");

        let client_listener = TcpListener::bind(self.config.client_addr).await?;
        let client_addr = client_listener.local_addr()?;
        tracing::info!(addr = %client_addr, "Client listener bound");

        if let Some(tx) = self.peer_addr_tx.take() {
            let _ = tx.send(peer_addr);
        }
        if let Some(tx) = self.client_addr_tx.take() {
            let _ = tx.send(client_addr);
        }

        if self.config.enable_discovery {
            let advertise_host = match &self.config.advertise_host {
                Some(host) => host.clone(),
                None => local_ip().to_string(),
            };
            // Announce the port actually bound, not the configured one
            let advertise_port = peer_addr.port();

            let announcer_config = self.config.clone();
            let announcer_host = advertise_host.clone();
            let announcer_shutdown = self.shutdown_tx.subscribe();
            tokio::spawn(async move {
                if let Err(e) =
                    run_announcer(announcer_config, announcer_host, advertise_port, announcer_shutdown)
                        .await
                {
                    tracing::error!(error = %e, "Discovery announcer failed");
                }
            });

            let listener_config = self.config.clone();
            let listener_sessions = self.sessions.clone();
            let listener_shutdown = self.shutdown_tx.subscribe();
            tokio::spawn(async move {
                if let Err(e) = run_listener(
                    listener_config,
                    listener_sessions,
                    advertise_host,
                    advertise_port,
                    listener_shutdown,
                )
                .await
                {
                    tracing::error!(error = %e, "Discovery listener failed");
                }
            });
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Network node shutting down");
                    self.sessions.shutdown().await;
                    break;
                }

                result = peer_listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!(addr = %addr, "Accepted peer connection");
                            let sessions = self.sessions.clone();
                            tokio::spawn(async move {
                                if let Err(e) = sessions.accept(stream, addr).await {
                                    tracing::warn!(addr = %addr, error = %e, "Peer accept failed");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Peer accept error");
                        }
                    }
                }

                result = client_listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let hub = self.hub.clone();
                            let store = self.store.clone();
                            tokio::spawn(spawn_client_connection(hub, store, stream, addr));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Client accept error");
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racewire_store::MemoryBackend;

    #[tokio::test]
    async fn test_node_creation() {
        let store = Arc::new(RaceStore::new(Arc::new(MemoryBackend::new())));
        store.init().unwrap();

        let config = NetConfig::new(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:0".parse().unwrap(),
        )
        .with_discovery(false);

        let node = NetNode::new(config, store);
        assert_eq!(node.sessions().session_count().await, 0);
        assert_eq!(node.hub().client_count().await, 0);
    }
}
