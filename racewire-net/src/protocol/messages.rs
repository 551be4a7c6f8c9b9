//! Protocol message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use racewire_core::{DeviceIdentify, Flag, PenaltyRecord, PitAction, RaceEvent, Snapshot};

/// A UDP discovery datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryMessage {
    /// Periodic presence announcement broadcast to the local network.
    BackendAnnounce {
        /// Host the peer listener is reachable at.
        host: String,
        /// Port of the peer listener.
        port: u16,
    },
}

/// The command word of a peer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerCmd {
    /// Ask the remote side for its full state.
    RequestState,
}

/// The tag of a peer state push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Full-state replacement.
    StateUpdate,
}

/// A message on the peer TCP surface.
///
/// Requests carry a `cmd` field, pushes a `type` field; the two shapes are
/// disjoint so decoding is untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerMessage {
    /// A request from the remote side.
    Request {
        /// The command word.
        cmd: PeerCmd,
    },
    /// A full-state push.
    Update {
        /// The message tag.
        #[serde(rename = "type")]
        kind: UpdateKind,
        /// The sender's full state.
        state: Snapshot,
    },
}

impl PeerMessage {
    /// A state request.
    pub fn request_state() -> Self {
        PeerMessage::Request {
            cmd: PeerCmd::RequestState,
        }
    }

    /// A full-state push.
    pub fn state_update(state: Snapshot) -> Self {
        PeerMessage::Update {
            kind: UpdateKind::StateUpdate,
            state,
        }
    }
}

/// An event pushed to UI clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Full state sent once on connect.
    StateInit {
        /// The current full state.
        state: Snapshot,
    },
    /// Full state after a peer merge.
    StateUpdate {
        /// The merged full state.
        state: Snapshot,
    },
    /// The global flag changed.
    FlagChange {
        /// The new flag.
        flag: Flag,
        /// Full state after the change.
        state: Snapshot,
    },
    /// The race started.
    RaceStart {
        /// Full state after the change.
        state: Snapshot,
    },
    /// The race was reset.
    Reset {
        /// Full state after the change.
        state: Snapshot,
    },
    /// Safety car deployment changed.
    SafetyCar {
        /// Full state after the change.
        state: Snapshot,
    },
    /// A sector's local flag changed.
    SectorUpdate {
        /// The affected sector.
        sector_id: u8,
        /// Full state after the change.
        state: Snapshot,
    },
    /// A blue flag was set or cleared on a pilot.
    BlueAssign {
        /// The affected pilot number.
        number: String,
        /// Whether the flag is now set.
        assign: bool,
        /// Full state after the change.
        state: Snapshot,
    },
    /// A pilot was registered.
    PilotRegister {
        /// The new pilot's number.
        number: String,
        /// Full state after the change.
        state: Snapshot,
    },
    /// A penalty was recorded.
    PenaltyAdd {
        /// The recorded penalty.
        payload: PenaltyRecord,
        /// Full state after the change.
        state: Snapshot,
    },
    /// A pit-box action passed through.
    PitAction {
        /// The reported action.
        payload: PitAction,
    },
    /// A free-form race event passed through.
    Event {
        /// The reported event.
        payload: RaceEvent,
    },
    /// A device identification request passed through.
    IdentifyDevice {
        /// The request payload.
        payload: DeviceIdentify,
    },
    /// Reply to a client ping.
    Pong {
        /// Server time of the reply.
        ts: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::StateInit { .. } => "state_init",
            ClientEvent::StateUpdate { .. } => "state_update",
            ClientEvent::FlagChange { .. } => "flag_change",
            ClientEvent::RaceStart { .. } => "race_start",
            ClientEvent::Reset { .. } => "reset",
            ClientEvent::SafetyCar { .. } => "safety_car",
            ClientEvent::SectorUpdate { .. } => "sector_update",
            ClientEvent::BlueAssign { .. } => "blue_assign",
            ClientEvent::PilotRegister { .. } => "pilot_register",
            ClientEvent::PenaltyAdd { .. } => "penalty_add",
            ClientEvent::PitAction { .. } => "pit_action",
            ClientEvent::Event { .. } => "event",
            ClientEvent::IdentifyDevice { .. } => "identify_device",
            ClientEvent::Pong { .. } => "pong",
        }
    }
}

/// The command word of a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientCmd {
    /// Liveness probe.
    Ping,
}

/// A request from a UI client. Clients are read-only apart from pings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCommand {
    /// The command word.
    pub cmd: ClientCmd,
}
