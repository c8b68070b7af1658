//! Serializable snapshots of a court's complete political state
//!
//! The persistence layer receives a `CourtSnapshot` at save points and
//! hands one back at load. Restore validates structurally before any
//! state is built: a snapshot that fails validation is a fatal
//! `StateCorruption` error with no partial reconstruction. Older
//! snapshots load cleanly because optional fields default when absent.

use serde::{Deserialize, Serialize};

use crate::civilization::Civilization;
use crate::conspiracy::ConspiracyLedger;
use crate::core::error::{PoliticsError, Result};
use crate::events::{EventPipeline, HistoryLog};
use crate::turn::Court;

/// Current snapshot schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Everything needed to reconstruct a court
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtSnapshot {
    pub schema_version: u32,
    pub seed: u64,
    pub civ: Civilization,
    #[serde(default)]
    pub conspiracies: ConspiracyLedger,
    #[serde(default)]
    pub pending_events: EventPipeline,
    #[serde(default)]
    pub history: HistoryLog,
}

/// Capture a court's state at a save point
pub fn capture(court: &Court) -> CourtSnapshot {
    CourtSnapshot {
        schema_version: SCHEMA_VERSION,
        seed: court.seed,
        civ: court.civ.clone(),
        conspiracies: court.ledger.clone(),
        pending_events: court.pipeline.clone(),
        history: court.history.clone(),
    }
}

/// Reconstruct a court from a snapshot, validating first
pub fn restore(snapshot: CourtSnapshot) -> Result<Court> {
    validate(&snapshot)?;
    Ok(Court::from_parts(
        snapshot.civ,
        snapshot.conspiracies,
        snapshot.pending_events,
        snapshot.history,
        snapshot.seed,
    ))
}

/// Serialize a snapshot to JSON
pub fn to_json(snapshot: &CourtSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Parse and restore from JSON in one step
pub fn from_json(json: &str) -> Result<Court> {
    let snapshot: CourtSnapshot = serde_json::from_str(json)
        .map_err(|e| PoliticsError::StateCorruption(format!("unreadable snapshot: {}", e)))?;
    restore(snapshot)
}

/// Structural validation, run before any reconstruction
fn validate(snapshot: &CourtSnapshot) -> Result<()> {
    if snapshot.schema_version > SCHEMA_VERSION {
        return Err(PoliticsError::StateCorruption(format!(
            "snapshot schema {} is newer than supported {}",
            snapshot.schema_version, SCHEMA_VERSION
        )));
    }

    let civ = &snapshot.civ;
    if !(0.0..=1.0).contains(&civ.stability) {
        return Err(PoliticsError::StateCorruption(format!(
            "stability {} outside [0, 1]",
            civ.stability
        )));
    }

    for advisor in &civ.advisors {
        if !(0.0..=1.0).contains(&advisor.loyalty) || !(0.0..=1.0).contains(&advisor.influence) {
            return Err(PoliticsError::StateCorruption(format!(
                "advisor {:?} carries out-of-range loyalty/influence",
                advisor.id
            )));
        }
    }

    for (advisor, trust) in &civ.leader.trust {
        if !(-1.0..=1.0).contains(trust) {
            return Err(PoliticsError::StateCorruption(format!(
                "leader trust for {:?} outside [-1, 1]",
                advisor
            )));
        }
    }

    for conspiracy in snapshot.conspiracies.iter() {
        if conspiracy.phase.is_live() {
            for member in &conspiracy.members {
                if civ.advisor(*member).is_none() {
                    return Err(PoliticsError::StateCorruption(format!(
                        "conspiracy {:?} references missing advisor {:?}",
                        conspiracy.id, member
                    )));
                }
            }
        }
    }

    Ok(())
}
