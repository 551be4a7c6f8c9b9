//! Network configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Frame magic bytes identifying the Racewire wire format.
pub const FRAME_MAGIC: [u8; 4] = [0x52, 0x41, 0x43, 0x57]; // "RACW"

/// Maximum message size in bytes (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default UDP discovery port.
pub const DEFAULT_DISCOVERY_PORT: u16 = 9999;

/// Default interval between discovery announcements.
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(2);

/// Default timeout for establishing peer connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the networking node.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Address to bind the peer listener to.
    pub peer_addr: SocketAddr,

    /// Address to bind the client listener to.
    pub client_addr: SocketAddr,

    /// UDP port used for discovery announcements.
    pub discovery_port: u16,

    /// Interval between discovery announcements.
    pub announce_interval: Duration,

    /// Host to advertise in announcements. Detected from the default
    /// route when unset.
    pub advertise_host: Option<String>,

    /// Timeout for establishing outbound peer connections.
    pub connect_timeout: Duration,

    /// Whether discovery announce and listen tasks run at all.
    pub enable_discovery: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            peer_addr: "0.0.0.0:9990".parse().unwrap(),
            client_addr: "0.0.0.0:9991".parse().unwrap(),
            discovery_port: DEFAULT_DISCOVERY_PORT,
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
            advertise_host: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            enable_discovery: true,
        }
    }
}

impl NetConfig {
    /// Create a configuration with the given listener addresses.
    pub fn new(peer_addr: SocketAddr, client_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            client_addr,
            ..Default::default()
        }
    }

    /// Set the discovery port.
    pub fn with_discovery_port(mut self, port: u16) -> Self {
        self.discovery_port = port;
        self
    }

    /// Set the announce interval.
    pub fn with_announce_interval(mut self, interval: Duration) -> Self {
        self.announce_interval = interval;
        self
    }

    /// Set the advertised host.
    pub fn with_advertise_host(mut self, host: impl Into<String>) -> Self {
        self.advertise_host = Some(host.into());
        self
    }

    /// Set the peer connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable discovery.
    pub fn with_discovery(mut self, enabled: bool) -> Self {
        self.enable_discovery = enabled;
        self
    }
}
