//! Network-related RPC methods.

use std::sync::Arc;

use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;
use serde::{Deserialize, Serialize};

use super::{internal_error, RpcState};

/// Peer information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub addr: String,
    pub direction: String,
    pub connected_secs: u64,
}

/// Node information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub version: String,
    pub started: bool,
    pub pilots: usize,
    pub connections: u64,
}

/// Register network RPC methods.
pub fn register_methods(module: &mut RpcModule<Arc<RpcState>>) {
    // getPeerInfo - list connected peers
    module
        .register_async_method("getPeerInfo", |_params, state, _| async move {
            let peers: Vec<PeerInfo> = state
                .sessions
                .sessions()
                .await
                .iter()
                .map(|s| PeerInfo {
                    addr: s.addr.to_string(),
                    direction: s.direction.to_string(),
                    connected_secs: s.duration().as_secs(),
                })
                .collect();

            Ok::<_, ErrorObjectOwned>(peers)
        })
        .unwrap();

    // getConnectionCount - get number of peer sessions
    module
        .register_async_method("getConnectionCount", |_params, state, _| async move {
            let count = state.sessions.session_count().await as u64;
            Ok::<_, ErrorObjectOwned>(count)
        })
        .unwrap();

    // connectPeer - manually dial a peer, for static setups without discovery
    module
        .register_async_method("connectPeer", |params, state, _| async move {
            let addr: String = params.one()?;

            let socket_addr: std::net::SocketAddr = addr.parse().map_err(|_| {
                ErrorObjectOwned::owned(-32602, "Invalid address format", None::<()>)
            })?;

            state.sessions.connect(socket_addr).await.map_err(|e| {
                ErrorObjectOwned::owned(-32603, e.to_string(), None::<()>)
            })?;

            Ok::<_, ErrorObjectOwned>(true)
        })
        .unwrap();

    // getNodeInfo - summary of this instance
    module
        .register_async_method("getNodeInfo", |_params, state, _| async move {
            let race = state.store.race().map_err(internal_error)?;
            let pilots = state.store.pilots().map_err(internal_error)?;
            let connections = state.sessions.session_count().await as u64;

            Ok::<_, ErrorObjectOwned>(NodeInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                started: race.started,
                pilots: pilots.len(),
                connections,
            })
        })
        .unwrap();
}
