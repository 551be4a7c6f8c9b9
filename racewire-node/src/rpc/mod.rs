//! JSON-RPC server.
//!
//! The RPC surface is the only mutation entry point: race-control
//! frontends (and operators with curl) drive the service through it,
//! while UI clients watch the client TCP feed.

pub mod control;
pub mod network;

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::server::{ServerBuilder, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;

use racewire_net::{MutationDispatcher, NetError, SessionManager};
use racewire_store::{RaceStore, RocksBackend};

/// Shared state for RPC handlers.
pub struct RpcState {
    /// Persistent race state.
    pub store: Arc<RaceStore<RocksBackend>>,

    /// The mutation dispatcher.
    pub dispatcher: Arc<MutationDispatcher<RocksBackend>>,

    /// Peer session manager.
    pub sessions: Arc<SessionManager<RocksBackend>>,
}

/// Map a dispatch failure to a JSON-RPC error.
///
/// Constraint violations are the caller's fault (-32602); everything
/// else is an internal error (-32603).
pub fn dispatch_error(e: NetError) -> ErrorObjectOwned {
    match &e {
        NetError::Store(store_err) if store_err.is_constraint_violation() => {
            ErrorObjectOwned::owned(-32602, store_err.to_string(), None::<()>)
        }
        _ => ErrorObjectOwned::owned(-32603, e.to_string(), None::<()>),
    }
}

/// Map a storage read failure to a JSON-RPC internal error.
pub fn internal_error(e: impl std::fmt::Display) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32603, e.to_string(), None::<()>)
}

/// Build the complete RPC module with all methods.
pub fn build_rpc_module(state: Arc<RpcState>) -> RpcModule<Arc<RpcState>> {
    let mut module = RpcModule::new(state.clone());

    // Register race-control methods
    control::register_methods(&mut module);

    // Register network methods
    network::register_methods(&mut module);

    module
}

/// RPC server handle with local address.
pub struct RpcServerHandle {
    /// The server handle for shutdown.
    handle: ServerHandle,
    /// The local address the server is bound to.
    local_addr: SocketAddr,
}

impl RpcServerHandle {
    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the server.
    pub fn stop(&self) -> Result<(), anyhow::Error> {
        self.handle
            .stop()
            .map_err(|e| anyhow::anyhow!("Failed to stop server: {:?}", e))
    }
}

/// Start the JSON-RPC server.
pub async fn start_rpc_server(
    addr: SocketAddr,
    state: Arc<RpcState>,
) -> anyhow::Result<RpcServerHandle> {
    let server = ServerBuilder::default().build(addr).await?;
    let local_addr = server.local_addr()?;

    let module = build_rpc_module(state);

    tracing::info!("Starting JSON-RPC server on {}", local_addr);

    let handle = server.start(module);

    Ok(RpcServerHandle { handle, local_addr })
}
