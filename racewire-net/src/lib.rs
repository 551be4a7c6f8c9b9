//! # Racewire Net
//!
//! Networking for the Racewire race-control service.
//!
//! This crate provides:
//! - UDP broadcast discovery (periodic announce + listener)
//! - Peer sessions replicating the full race state over TCP
//! - The client hub fanning events out to UI connections
//! - The mutation dispatcher tying storage, peers, and clients together
//!
//! ## Architecture
//!
//! `NetNode` owns two TCP listeners (peer and client) and the discovery
//! tasks, and runs a single select loop. Each peer session and each client
//! connection runs in its own task, reached through an mpsc channel held by
//! the session manager or client hub. Mutations enter through the
//! `MutationDispatcher`, which commits to storage first and only then fans
//! the new snapshot out.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod node;
pub mod protocol;
pub mod session;

pub use config::{NetConfig, FRAME_MAGIC, MAX_MESSAGE_SIZE};
pub use dispatch::{Mutation, MutationDispatcher};
pub use error::{NetError, NetResult};
pub use hub::ClientHub;
pub use node::NetNode;
pub use protocol::{ClientCommand, ClientEvent, DiscoveryMessage, PeerMessage};
pub use session::{SessionInfo, SessionManager};
