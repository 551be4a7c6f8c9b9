//! Periodic discovery announcements.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::config::NetConfig;
use crate::error::NetResult;
use crate::protocol::DiscoveryMessage;

/// Broadcast a presence announcement every `announce_interval` until
/// shutdown.
///
/// Send failures are logged and the loop keeps going; a transiently
/// unavailable network must not kill the task.
pub async fn run_announcer(
    config: Arc<NetConfig>,
    advertise_host: String,
    advertise_port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> NetResult<()> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.set_broadcast(true)?;

    let announce = DiscoveryMessage::BackendAnnounce {
        host: advertise_host,
        port: advertise_port,
    };
    let payload = serde_json::to_vec(&announce)?;
    let target = (Ipv4Addr::BROADCAST, config.discovery_port);

    tracing::info!(
        port = config.discovery_port,
        interval = ?config.announce_interval,
        "Discovery announcer started"
    );

    let mut timer = interval(config.announce_interval);
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!("Discovery announcer shutting down");
                return Ok(());
            }
            _ = timer.tick() => {
                if let Err(e) = socket.send_to(&payload, target).await {
                    tracing::debug!(error = %e, "Announce send failed");
                }
            }
        }
    }
}
