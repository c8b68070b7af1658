//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for civilizations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CivId(pub u32);

impl CivId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for advisors within a civilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdvisorId(pub u32);

impl AdvisorId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for memories (allocated sequentially per store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub u64);

/// Unique identifier for political events (allocated sequentially per pipeline)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Unique identifier for conspiracies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConspiracyId(pub u32);

/// Game turn counter (simulation time unit)
pub type Turn = u64;

/// Council portfolio held by an advisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisorRole {
    Military,
    Economic,
    Diplomatic,
    Cultural,
    Religious,
    Security,
}

impl AdvisorRole {
    pub const ALL: [AdvisorRole; 6] = [
        AdvisorRole::Military,
        AdvisorRole::Economic,
        AdvisorRole::Diplomatic,
        AdvisorRole::Cultural,
        AdvisorRole::Religious,
        AdvisorRole::Security,
    ];
}

/// Advisor lifecycle status
///
/// Terminal transitions (dismissed/executed/retired) are irreversible and
/// freeze further memory writes for that advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisorStatus {
    Active,
    Dismissed,
    Executed,
    Retired,
}

impl AdvisorStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AdvisorStatus::Active)
    }
}

/// How a leader runs the council; modifies decision weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadershipStyle {
    Authoritarian,
    Collegial,
    Paranoid,
    Charismatic,
}

/// A node in the relationship graph: an advisor or the civilization's leader
///
/// The graph is per-civilization, so the leader needs no id of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRef {
    Advisor(AdvisorId),
    Leader,
}
