//! The mutation dispatcher.
//!
//! Every state change enters here, regardless of origin (RPC, tooling,
//! tests). The dispatcher commits to storage first; only a successful
//! commit fans out, so clients and peers never observe a state the local
//! store does not hold.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use racewire_core::{DeviceIdentify, Flag, PenaltyRecord, PitAction, RaceEvent, Snapshot};
use racewire_store::{KvBackend, RaceStore};

use crate::error::NetResult;
use crate::hub::ClientHub;
use crate::protocol::{ClientEvent, PeerMessage};
use crate::session::SessionManager;

/// A state mutation request.
///
/// Serialized form doubles as the action log payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Set the global flag.
    SetFlag {
        /// The new flag.
        flag: Flag,
    },
    /// Start the race.
    StartRace,
    /// Reset the race.
    ResetRace,
    /// Change safety car deployment.
    SetSafetyCar {
        /// Whether the safety car is out.
        active: bool,
        /// Whether it enters this lap.
        in_this_lap: bool,
    },
    /// Set a sector's local flag.
    SetSectorFlag {
        /// The target sector.
        sector_id: u8,
        /// The new flag.
        flag: Flag,
        /// Whether marshals are intervening.
        marshal_intervene: bool,
    },
    /// Set or clear a pilot's blue flag.
    AssignBlueFlag {
        /// The target pilot number.
        number: String,
        /// Set or clear.
        assign: bool,
    },
    /// Register a pilot.
    RegisterPilot {
        /// Given name.
        first_name: String,
        /// Family name.
        last_name: String,
        /// Race number.
        number: String,
    },
    /// Record a penalty.
    AddPenalty(PenaltyRecord),
    /// Pass through a pit-box action.
    PitAction(PitAction),
    /// Pass through a free-form race event.
    Event(RaceEvent),
    /// Pass through a device identification request.
    IdentifyDevice(DeviceIdentify),
}

impl Mutation {
    /// The operation name, used for the action log and logging.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetFlag { .. } => "set_flag",
            Mutation::StartRace => "start_race",
            Mutation::ResetRace => "reset_race",
            Mutation::SetSafetyCar { .. } => "set_safety_car",
            Mutation::SetSectorFlag { .. } => "set_sector_flag",
            Mutation::AssignBlueFlag { .. } => "assign_blue_flag",
            Mutation::RegisterPilot { .. } => "register_pilot",
            Mutation::AddPenalty(_) => "add_penalty",
            Mutation::PitAction(_) => "pit_action",
            Mutation::Event(_) => "event",
            Mutation::IdentifyDevice(_) => "identify_device",
        }
    }
}

/// Applies mutations and fans the results out to clients and peers.
pub struct MutationDispatcher<B: KvBackend> {
    store: Arc<RaceStore<B>>,
    sessions: Arc<SessionManager<B>>,
    hub: Arc<ClientHub>,
}

impl<B: KvBackend + 'static> MutationDispatcher<B> {
    /// Create a dispatcher over the given store, sessions, and hub.
    pub fn new(
        store: Arc<RaceStore<B>>,
        sessions: Arc<SessionManager<B>>,
        hub: Arc<ClientHub>,
    ) -> Self {
        Self {
            store,
            sessions,
            hub,
        }
    }

    /// Apply a mutation and fan out the resulting state.
    ///
    /// A rejected mutation (constraint violation) returns the error and
    /// nothing is broadcast. A failed action log append is logged and
    /// does not block fan-out.
    pub async fn dispatch(&self, mutation: Mutation) -> NetResult<Snapshot> {
        let event = self.apply(&mutation)?;

        match self.store.append_action(mutation.name(), serde_json::to_value(&mutation)?) {
            Ok(seq) => tracing::debug!(op = mutation.name(), seq, "Action logged"),
            Err(e) => tracing::warn!(op = mutation.name(), error = %e, "Action log append failed"),
        }

        let snapshot = self.store.read_snapshot()?;
        tokio::join!(
            self.hub.broadcast(&event),
            self.sessions
                .broadcast_to_peers(PeerMessage::state_update(snapshot.clone())),
        );

        Ok(snapshot)
    }

    /// Commit a mutation to storage and build the client event for it.
    fn apply(&self, mutation: &Mutation) -> NetResult<ClientEvent> {
        let event = match mutation {
            Mutation::SetFlag { flag } => {
                self.store.set_flag(*flag)?;
                ClientEvent::FlagChange {
                    flag: *flag,
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::StartRace => {
                self.store.start_race()?;
                ClientEvent::RaceStart {
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::ResetRace => {
                self.store.reset_race()?;
                ClientEvent::Reset {
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::SetSafetyCar {
                active,
                in_this_lap,
            } => {
                self.store.set_safety_car(*active, *in_this_lap)?;
                ClientEvent::SafetyCar {
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::SetSectorFlag {
                sector_id,
                flag,
                marshal_intervene,
            } => {
                self.store
                    .set_sector_flag(*sector_id, *flag, *marshal_intervene)?;
                ClientEvent::SectorUpdate {
                    sector_id: *sector_id,
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::AssignBlueFlag { number, assign } => {
                self.store.assign_blue_flag(number, *assign)?;
                ClientEvent::BlueAssign {
                    number: number.clone(),
                    assign: *assign,
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::RegisterPilot {
                first_name,
                last_name,
                number,
            } => {
                self.store.register_pilot(first_name, last_name, number)?;
                ClientEvent::PilotRegister {
                    number: number.clone(),
                    state: self.store.read_snapshot()?,
                }
            }
            Mutation::AddPenalty(penalty) => {
                self.store.add_penalty(penalty)?;
                ClientEvent::PenaltyAdd {
                    payload: penalty.clone(),
                    state: self.store.read_snapshot()?,
                }
            }
            // Pass-through notifications carry no server state beyond
            // the action log entry
            Mutation::PitAction(payload) => ClientEvent::PitAction {
                payload: payload.clone(),
            },
            Mutation::Event(payload) => ClientEvent::Event {
                payload: payload.clone(),
            },
            Mutation::IdentifyDevice(payload) => ClientEvent::IdentifyDevice {
                payload: payload.clone(),
            },
        };
        Ok(event)
    }
}
