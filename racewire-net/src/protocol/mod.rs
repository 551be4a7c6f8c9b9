//! Wire protocol definitions.
//!
//! All three surfaces speak JSON. Discovery datagrams carry a single bare
//! JSON object; the peer and client TCP surfaces wrap JSON payloads in
//! length-prefixed frames (see [`framing`]).

pub mod framing;
pub mod messages;

pub use framing::{encode_frame, JsonCodec};
pub use messages::{
    ClientCmd, ClientCommand, ClientEvent, DiscoveryMessage, PeerMessage,
};
