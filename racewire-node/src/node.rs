//! Node orchestrator.
//!
//! Composes storage, networking, and the RPC server into a running
//! service.

use std::sync::Arc;

use racewire_net::{MutationDispatcher, NetNode, SessionManager};
use racewire_store::{RaceStore, RocksBackend};

use crate::config::NodeConfig;
use crate::rpc::{self, RpcState};
use crate::shutdown::wait_for_shutdown_signal;

/// The main node structure.
pub struct Node {
    /// Node configuration.
    config: NodeConfig,

    /// Persistent race state.
    store: Arc<RaceStore<RocksBackend>>,
}

impl Node {
    /// Create a new node with the given configuration.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        tracing::info!("Data directory: {:?}", config.data_dir);

        let db_path = config.data_dir.join("race.db");
        let backend = Arc::new(RocksBackend::open(&db_path)?);
        let store = Arc::new(RaceStore::new(backend));
        store.init()?;

        let race = store.race()?;
        tracing::info!(
            started = race.started,
            flag = %race.flag,
            "Race state loaded"
        );

        Ok(Self { config, store })
    }

    /// Run the node until a shutdown signal arrives.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!("Starting Racewire node...");
        tracing::info!("  Peer address: {}", self.config.peer_addr);
        tracing::info!("  Client address: {}", self.config.client_addr);
        tracing::info!("  RPC address: {}", self.config.rpc_addr);
        tracing::info!("  Discovery enabled: {}", self.config.discovery_enabled);

        // Start networking
        let net_node = NetNode::new(self.config.net_config(), self.store.clone());
        let dispatcher: Arc<MutationDispatcher<RocksBackend>> = net_node.dispatcher();
        let sessions: Arc<SessionManager<RocksBackend>> = net_node.sessions();
        let net_shutdown = net_node.shutdown_handle();

        tokio::spawn(async move {
            match net_node.run().await {
                Ok(()) => tracing::info!("Network node stopped gracefully"),
                Err(e) => tracing::error!("Network node error: {}", e),
            }
        });

        // Start RPC server
        let rpc_state = Arc::new(RpcState {
            store: self.store.clone(),
            dispatcher,
            sessions,
        });
        let rpc_handle = rpc::start_rpc_server(self.config.rpc_addr, rpc_state).await?;
        tracing::info!("RPC server listening on {}", rpc_handle.local_addr());

        // Wait for shutdown signal
        wait_for_shutdown_signal().await;

        tracing::info!("Shutting down node...");
        let _ = net_shutdown.send(());

        rpc_handle.stop()?;
        tracing::info!("RPC server stopped");

        self.store.flush()?;
        tracing::info!("Node shutdown complete");
        Ok(())
    }
}
