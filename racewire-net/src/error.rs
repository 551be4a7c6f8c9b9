//! Network error types.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use racewire_store::StoreError;

/// Network-specific errors.
#[derive(Debug, Error)]
pub enum NetError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to serialize or deserialize a message.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Declared or actual message size.
        size: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// Invalid frame magic bytes.
    #[error("invalid frame magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// The expected magic bytes.
        expected: [u8; 4],
        /// The bytes actually read.
        actual: [u8; 4],
    },

    /// Peer connection timed out.
    #[error("connection timeout to {addr}")]
    ConnectionTimeout {
        /// The dialed address.
        addr: SocketAddr,
    },

    /// Channel send error.
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// Storage error surfaced through a network operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Node is shutting down.
    #[error("node shutting down")]
    Shutdown,
}

impl From<serde_json::Error> for NetError {
    fn from(err: serde_json::Error) -> Self {
        NetError::Serialization(err.to_string())
    }
}

/// Result type for network operations.
pub type NetResult<T> = Result<T, NetError>;
