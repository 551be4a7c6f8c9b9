//! UDP broadcast discovery.
//!
//! Every instance announces itself on the local network at a fixed
//! interval and listens for announcements from others. An announcement
//! from an unknown peer triggers an outbound session dial; the session
//! manager deduplicates, so repeated announcements are harmless.

mod announcer;
mod listener;

pub use announcer::run_announcer;
pub use listener::run_listener;

use std::net::IpAddr;

/// Best-effort detection of the host's LAN address.
///
/// Opens a UDP socket toward a public address to learn which local
/// interface the default route uses. No packet is sent.
pub fn local_ip() -> IpAddr {
    fn detect() -> std::io::Result<IpAddr> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip())
    }
    detect().unwrap_or_else(|_| IpAddr::from([127, 0, 0, 1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_is_not_unspecified() {
        assert!(!local_ip().is_unspecified());
    }
}
