//! Race-control RPC methods.

use std::str::FromStr;
use std::sync::Arc;

use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;
use serde::{Deserialize, Serialize};

use racewire_core::{DeviceIdentify, Flag, PenaltyRecord, PitAction, RaceEvent, Snapshot};
use racewire_net::Mutation;

use super::{dispatch_error, internal_error, RpcState};

/// Parameters for `setFlag`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetFlagParams {
    pub flag: String,
}

/// Parameters for `setSafetyCar`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetSafetyCarParams {
    pub active: bool,
    #[serde(default)]
    pub in_this_lap: bool,
}

/// Parameters for `setSectorFlag`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetSectorFlagParams {
    pub sector_id: u8,
    pub flag: String,
    #[serde(default)]
    pub marshal_intervene: bool,
}

/// Parameters for `assignBlueFlag`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignBlueFlagParams {
    pub number: String,
    pub assign: bool,
}

/// Parameters for `registerPilot`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPilotParams {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub number: String,
}

/// Parameters for `addPenalty`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddPenaltyParams {
    pub target_number: String,
    #[serde(rename = "type")]
    pub penalty_type: String,
    #[serde(default)]
    pub amount_seconds: u32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub who_hit: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub comment: String,
}

/// Parameters for `pitAction`.
#[derive(Debug, Clone, Deserialize)]
pub struct PitActionParams {
    pub box_id: String,
    pub action: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Parameters for `recordEvent`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventParams {
    pub event_type: String,
    #[serde(default)]
    pub sector_id: Option<u8>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Parameters for `identifyDevice`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyDeviceParams {
    pub kind: String,
    #[serde(default)]
    pub sector_id: Option<u8>,
    #[serde(default)]
    pub host: Option<String>,
}

/// Result of a successful mutation.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    pub ok: bool,
    pub state: Snapshot,
}

impl MutationResult {
    fn new(state: Snapshot) -> Self {
        Self { ok: true, state }
    }
}

fn parse_flag(raw: &str) -> Result<Flag, ErrorObjectOwned> {
    Flag::from_str(raw).map_err(|e| ErrorObjectOwned::owned(-32602, e.to_string(), None::<()>))
}

/// Register race-control RPC methods.
pub fn register_methods(module: &mut RpcModule<Arc<RpcState>>) {
    // getState - read the full race snapshot
    module
        .register_async_method("getState", |_params, state, _| async move {
            let snapshot = state.store.read_snapshot().map_err(internal_error)?;
            Ok::<_, ErrorObjectOwned>(snapshot)
        })
        .unwrap();

    // setFlag - change the global race flag
    module
        .register_async_method("setFlag", |params, state, _| async move {
            let p: SetFlagParams = params.one()?;
            let flag = parse_flag(&p.flag)?;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::SetFlag { flag })
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // startRace - mark the race as started
    module
        .register_async_method("startRace", |_params, state, _| async move {
            let snapshot = state
                .dispatcher
                .dispatch(Mutation::StartRace)
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // resetRace - clear pilots, flag and safety car state
    module
        .register_async_method("resetRace", |_params, state, _| async move {
            let snapshot = state
                .dispatcher
                .dispatch(Mutation::ResetRace)
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // setSafetyCar - toggle the safety car
    module
        .register_async_method("setSafetyCar", |params, state, _| async move {
            let p: SetSafetyCarParams = params.one()?;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::SetSafetyCar {
                    active: p.active,
                    in_this_lap: p.in_this_lap,
                })
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // setSectorFlag - change a marshal sector flag
    module
        .register_async_method("setSectorFlag", |params, state, _| async move {
            let p: SetSectorFlagParams = params.one()?;
            let flag = parse_flag(&p.flag)?;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::SetSectorFlag {
                    sector_id: p.sector_id,
                    flag,
                    marshal_intervene: p.marshal_intervene,
                })
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // assignBlueFlag - assign or clear a pilot's blue flag
    module
        .register_async_method("assignBlueFlag", |params, state, _| async move {
            let p: AssignBlueFlagParams = params.one()?;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::AssignBlueFlag {
                    number: p.number,
                    assign: p.assign,
                })
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // registerPilot - add a pilot before the race starts
    module
        .register_async_method("registerPilot", |params, state, _| async move {
            let p: RegisterPilotParams = params.one()?;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::RegisterPilot {
                    first_name: p.first_name,
                    last_name: p.last_name,
                    number: p.number,
                })
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // addPenalty - record a penalty against a pilot
    module
        .register_async_method("addPenalty", |params, state, _| async move {
            let p: AddPenaltyParams = params.one()?;

            let mut penalty = PenaltyRecord::new(&p.target_number, &p.penalty_type);
            penalty.amount_seconds = p.amount_seconds;
            penalty.reason = p.reason;
            penalty.who_hit = p.who_hit;
            penalty.contact_person = p.contact_person;
            penalty.comment = p.comment;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::AddPenalty(penalty))
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // pitAction - relay a pit box action to clients
    module
        .register_async_method("pitAction", |params, state, _| async move {
            let p: PitActionParams = params.one()?;

            let mut action = PitAction::new(p.box_id, &p.action);
            action.note = p.note;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::PitAction(action))
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // recordEvent - relay a freeform race event to clients
    module
        .register_async_method("recordEvent", |params, state, _| async move {
            let p: RecordEventParams = params.one()?;

            let mut event = RaceEvent::new(&p.event_type);
            event.sector_id = p.sector_id;
            event.number = p.number;
            event.details = p.details;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::Event(event))
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();

    // identifyDevice - announce a device (sector panel, pit display)
    module
        .register_async_method("identifyDevice", |params, state, _| async move {
            let p: IdentifyDeviceParams = params.one()?;

            let mut identify = DeviceIdentify::new(&p.kind);
            identify.sector_id = p.sector_id;
            identify.host = p.host;

            let snapshot = state
                .dispatcher
                .dispatch(Mutation::IdentifyDevice(identify))
                .await
                .map_err(dispatch_error)?;

            Ok::<_, ErrorObjectOwned>(MutationResult::new(snapshot))
        })
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_flag_params_deserialize() {
        let p: SetFlagParams = serde_json::from_str(r#"{"flag":"yellow"}"#).unwrap();
        assert_eq!(p.flag, "yellow");
        assert!(parse_flag(&p.flag).is_ok());
    }

    #[test]
    fn unknown_flag_is_invalid_params() {
        let err = parse_flag("purple").unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn penalty_params_defaults() {
        let p: AddPenaltyParams =
            serde_json::from_str(r#"{"target_number":"42","type":"stop-and-go"}"#).unwrap();
        assert_eq!(p.amount_seconds, 0);
        assert!(p.reason.is_empty());
    }

    #[test]
    fn register_pilot_params_use_wire_names() {
        let p: RegisterPilotParams =
            serde_json::from_str(r#"{"firstName":"Ana","lastName":"Reyes","number":"7"}"#)
                .unwrap();
        assert_eq!(p.first_name, "Ana");
        assert_eq!(p.last_name, "Reyes");
    }
}
