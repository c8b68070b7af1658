//! Political events: the immutable record of what happened at court
//!
//! Events are triggered by the decision engine, the conspiracy machine, or
//! the external game layer; the pipeline applies their consequences exactly
//! once, after which the event is a historical record referenced by
//! memories.

mod history;
mod pipeline;

pub use history::HistoryLog;
pub use pipeline::{Consequence, EventPipeline, PipelineReport};

use serde::{Deserialize, Serialize};

use crate::core::types::{AdvisorId, AdvisorRole, ConspiracyId, EventId, Turn};
use crate::decision::PolicyOption;

/// Priority class for turn-internal ordering
///
/// Coup resolution is never pre-empted by lower-priority noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventClass {
    Coup,
    Crisis,
    Conspiracy,
    Decision,
    Appointment,
}

/// What happened, with kind-specific context payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    // Coups
    CoupSucceeded {
        conspiracy: ConspiracyId,
        new_leader: AdvisorId,
        members: Vec<AdvisorId>,
    },
    CoupFailed {
        conspiracy: ConspiracyId,
        members: Vec<AdvisorId>,
        detected: bool,
    },

    // Crises
    Crisis {
        description: String,
        severity: f32,
    },
    Purge {
        targets: Vec<AdvisorId>,
    },
    SecurityMeasures {
        until_turn: Turn,
    },
    ConspiracyDiscovered {
        conspiracy: ConspiracyId,
        members: Vec<AdvisorId>,
    },

    // Conspiracies (secret: never surfaced to the player or the leader's
    // advice channel)
    ConspiracyFormed {
        conspiracy: ConspiracyId,
    },
    ConspiracyGrew {
        conspiracy: ConspiracyId,
        recruit: AdvisorId,
    },
    ConspiracyDissolved {
        conspiracy: ConspiracyId,
    },
    ResentmentFestered {
        advisor: AdvisorId,
    },

    // Decisions
    LeaderDecision {
        option: PolicyOption,
        followed: Vec<AdvisorId>,
        overridden: Vec<AdvisorId>,
        negative_majority: bool,
    },
    SupportRequested {
        by: AdvisorId,
        granted: bool,
    },
    DiplomacyOutcome {
        favorable: bool,
        description: String,
    },
    CombatOutcome {
        victory: bool,
        description: String,
    },
    ResearchCompleted {
        description: String,
    },

    // Appointments
    AdvisorAppointed {
        advisor: AdvisorId,
        role: AdvisorRole,
    },
    AdvisorDismissed {
        advisor: AdvisorId,
    },
    AdvisorExecuted {
        advisor: AdvisorId,
    },
    AdvisorRetired {
        advisor: AdvisorId,
    },
}

impl EventKind {
    pub fn class(&self) -> EventClass {
        match self {
            EventKind::CoupSucceeded { .. } | EventKind::CoupFailed { .. } => EventClass::Coup,

            EventKind::Crisis { .. }
            | EventKind::Purge { .. }
            | EventKind::SecurityMeasures { .. }
            | EventKind::ConspiracyDiscovered { .. } => EventClass::Crisis,

            EventKind::ConspiracyFormed { .. }
            | EventKind::ConspiracyGrew { .. }
            | EventKind::ConspiracyDissolved { .. }
            | EventKind::ResentmentFestered { .. } => EventClass::Conspiracy,

            EventKind::LeaderDecision { .. }
            | EventKind::SupportRequested { .. }
            | EventKind::DiplomacyOutcome { .. }
            | EventKind::CombatOutcome { .. }
            | EventKind::ResearchCompleted { .. } => EventClass::Decision,

            EventKind::AdvisorAppointed { .. }
            | EventKind::AdvisorDismissed { .. }
            | EventKind::AdvisorExecuted { .. }
            | EventKind::AdvisorRetired { .. } => EventClass::Appointment,
        }
    }

    /// Player-visible headline, or None for secret events
    ///
    /// Conspiracy internals stay hidden until a discovery or a coup makes
    /// them public.
    pub fn headline(&self) -> Option<String> {
        match self {
            EventKind::CoupSucceeded { .. } => Some("The leader has been deposed in a coup".into()),
            EventKind::CoupFailed { detected: true, .. } => {
                Some("A coup plot was uncovered and crushed".into())
            }
            EventKind::CoupFailed { detected: false, .. } => {
                Some("A coup attempt has failed".into())
            }
            EventKind::Crisis { description, .. } => Some(format!("Crisis: {}", description)),
            EventKind::Purge { targets } => {
                Some(format!("A purge sweeps the court ({} targeted)", targets.len()))
            }
            EventKind::SecurityMeasures { .. } => {
                Some("Security measures tighten across the realm".into())
            }
            EventKind::ConspiracyDiscovered { members, .. } => {
                Some(format!("A conspiracy of {} was discovered", members.len()))
            }
            EventKind::LeaderDecision { option, .. } => {
                Some(format!("The leader commits to {}", option.label()))
            }
            EventKind::DiplomacyOutcome { description, .. }
            | EventKind::CombatOutcome { description, .. }
            | EventKind::ResearchCompleted { description } => Some(description.clone()),
            EventKind::AdvisorAppointed { .. } => Some("A new advisor joins the council".into()),
            EventKind::AdvisorDismissed { .. } => Some("An advisor was dismissed".into()),
            EventKind::AdvisorExecuted { .. } => Some("An advisor was executed".into()),
            EventKind::AdvisorRetired { .. } => Some("An advisor has retired".into()),

            EventKind::ConspiracyFormed { .. }
            | EventKind::ConspiracyGrew { .. }
            | EventKind::ConspiracyDissolved { .. }
            | EventKind::ResentmentFestered { .. }
            | EventKind::SupportRequested { .. } => None,
        }
    }
}

/// Get priority for event ordering (lower = higher priority)
pub fn event_priority(kind: &EventKind) -> u32 {
    match kind.class() {
        EventClass::Coup => 10,
        EventClass::Crisis => 20,
        EventClass::Conspiracy => 30,
        EventClass::Decision => 40,
        EventClass::Appointment => 50,
    }
}

/// An immutable political occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticalEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub participants: Vec<AdvisorId>,
    pub turn: Turn,
}
