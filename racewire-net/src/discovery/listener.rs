//! Discovery announcement listener.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use racewire_store::KvBackend;

use crate::config::NetConfig;
use crate::error::NetResult;
use crate::protocol::DiscoveryMessage;
use crate::session::SessionManager;

/// Listen for announcements and dial every peer that is not us.
///
/// Malformed datagrams are dropped silently: the discovery port is open
/// to the whole segment and stray traffic is expected.
pub async fn run_listener<B: KvBackend + 'static>(
    config: Arc<NetConfig>,
    sessions: Arc<SessionManager<B>>,
    advertise_host: String,
    advertise_port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> NetResult<()> {
    let socket = UdpSocket::bind(("0.0.0.0", config.discovery_port)).await?;
    tracing::info!(port = config.discovery_port, "Discovery listener started");

    let mut buf = vec![0u8; 2048];
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!("Discovery listener shutting down");
                return Ok(());
            }
            result = socket.recv_from(&mut buf) => {
                let (len, from) = match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::debug!(error = %e, "Discovery recv failed");
                        continue;
                    }
                };

                let message: DiscoveryMessage = match serde_json::from_slice(&buf[..len]) {
                    Ok(message) => message,
                    Err(_) => continue,
                };

                let DiscoveryMessage::BackendAnnounce { host, port } = message;

                // Our own broadcasts loop back; skip them
                if host == advertise_host && port == advertise_port {
                    continue;
                }

                let addr: SocketAddr = match format!("{host}:{port}").parse() {
                    Ok(addr) => addr,
                    Err(_) => {
                        tracing::debug!(host, port, from = %from, "Unparseable announce address");
                        continue;
                    }
                };

                if sessions.is_connected(&addr).await {
                    continue;
                }

                tracing::debug!(addr = %addr, from = %from, "Discovered peer");
                let sessions = sessions.clone();
                tokio::spawn(async move {
                    if let Err(e) = sessions.connect(addr).await {
                        tracing::debug!(addr = %addr, error = %e, "Dial after announce failed");
                    }
                });
            }
        }
    }
}
