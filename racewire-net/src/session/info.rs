//! Peer session metadata.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Direction of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// We initiated the connection.
    Dialed,
    /// The peer connected to us.
    Accepted,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Dialed => write!(f, "dialed"),
            Direction::Accepted => write!(f, "accepted"),
        }
    }
}

/// Information about a live peer session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Socket address of the peer.
    pub addr: SocketAddr,
    /// Direction of the session.
    pub direction: Direction,
    /// When the session was established.
    pub connected_at: Instant,
}

impl SessionInfo {
    /// Create info for a fresh session.
    pub fn new(addr: SocketAddr, direction: Direction) -> Self {
        Self {
            addr,
            direction,
            connected_at: Instant::now(),
        }
    }

    /// How long the session has been up.
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.addr, self.direction)
    }
}
