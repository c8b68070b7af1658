//! Civilization aggregate: one leader, a roster of advisors, and the
//! derived political-stability scalar
//!
//! All state internal to one civilization is mutated by exactly one
//! in-flight turn at a time; nothing here is shared across civilizations.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{PoliticsError, Result};
use crate::core::types::{ActorRef, AdvisorId, AdvisorRole, AdvisorStatus, CivId, LeadershipStyle, Turn};
use crate::memory::MemoryStore;
use crate::personality::Personality;
use crate::relations::RelationshipGraph;

/// An agent with personality, memory, loyalty and influence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisor {
    pub id: AdvisorId,
    pub name: String,
    pub role: AdvisorRole,
    pub personality: Personality,
    /// Loyalty to the current leader, in [0, 1]
    pub loyalty: f32,
    /// Court standing, in [0, 1]
    pub influence: f32,
    pub status: AdvisorStatus,
    pub appointed_turn: Turn,
}

impl Advisor {
    pub fn is_active(&self) -> bool {
        self.status == AdvisorStatus::Active
    }
}

/// The advisor-like entity holding executive decision authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    pub name: String,
    pub personality: Personality,
    pub style: LeadershipStyle,
    /// The leader's trust of each advisor, in [-1, 1]
    pub trust: AHashMap<AdvisorId, f32>,
    /// Flat bonus to defensive strength against coups
    pub security_modifier: f32,
    pub reign_started: Turn,
}

impl Leader {
    pub fn new(name: impl Into<String>, personality: Personality, style: LeadershipStyle) -> Self {
        Self {
            name: name.into(),
            personality,
            style,
            trust: AHashMap::new(),
            security_modifier: 1.0,
            reign_started: 0,
        }
    }

    pub fn trust_in(&self, advisor: AdvisorId) -> f32 {
        self.trust.get(&advisor).copied().unwrap_or(0.0)
    }
}

/// Derive a leadership style from a personality
///
/// Used when a conspiracy member seizes the throne.
pub fn style_from_personality(p: &Personality) -> LeadershipStyle {
    if p.ambition >= 0.7 {
        LeadershipStyle::Authoritarian
    } else if p.pragmatism >= 0.7 {
        LeadershipStyle::Collegial
    } else if p.corruption >= 0.5 {
        LeadershipStyle::Paranoid
    } else {
        LeadershipStyle::Charismatic
    }
}

/// One civilization's political state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Civilization {
    pub id: CivId,
    pub name: String,
    pub leader: Leader,
    pub advisors: Vec<Advisor>,
    pub memory: MemoryStore,
    pub relations: RelationshipGraph,
    /// Derived cohesion scalar in [0, 1]
    pub stability: f32,
    pub turn: Turn,
    /// Civilization-wide security crackdown window after a failed coup
    #[serde(default)]
    pub security_until: Option<Turn>,
    next_advisor_id: u32,
}

impl Civilization {
    pub fn new(id: CivId, name: impl Into<String>, leader: Leader) -> Self {
        Self {
            id,
            name: name.into(),
            leader,
            advisors: Vec::new(),
            memory: MemoryStore::new(),
            relations: RelationshipGraph::new(),
            stability: 0.7,
            turn: 0,
            security_until: None,
            next_advisor_id: 1,
        }
    }

    pub fn advisor(&self, id: AdvisorId) -> Option<&Advisor> {
        self.advisors.iter().find(|a| a.id == id)
    }

    pub fn advisor_mut(&mut self, id: AdvisorId) -> Option<&mut Advisor> {
        self.advisors.iter_mut().find(|a| a.id == id)
    }

    pub fn active_advisors(&self) -> impl Iterator<Item = &Advisor> {
        self.advisors.iter().filter(|a| a.is_active())
    }

    /// True if the id refers to an advisor who can still act
    pub fn is_active(&self, id: AdvisorId) -> bool {
        self.advisor(id).map_or(false, Advisor::is_active)
    }

    /// Appoint a new advisor, registering their memory stream and seeding
    /// the leader's trust from personality compatibility
    pub fn appoint(
        &mut self,
        name: impl Into<String>,
        role: AdvisorRole,
        personality: Personality,
        turn: Turn,
    ) -> AdvisorId {
        let id = AdvisorId(self.next_advisor_id);
        self.next_advisor_id += 1;

        let loyalty = personality.loyalty_baseline;
        self.advisors.push(Advisor {
            id,
            name: name.into(),
            role,
            personality,
            loyalty,
            influence: 0.5,
            status: AdvisorStatus::Active,
            appointed_turn: turn,
        });
        self.memory.register(id);

        let first_impression = self.leader.personality.compatibility(&personality) * 0.5;
        self.leader.trust.insert(id, first_impression);

        id
    }

    /// Transition an advisor to a new status
    ///
    /// Terminal transitions are irreversible and freeze the advisor's
    /// memory stream.
    pub fn set_status(&mut self, id: AdvisorId, status: AdvisorStatus) -> Result<()> {
        let advisor = self.advisor_mut(id).ok_or_else(|| {
            PoliticsError::DataConsistency(format!("unknown advisor {:?}", id))
        })?;

        if advisor.status.is_terminal() {
            return Err(PoliticsError::InvariantViolation(format!(
                "advisor {:?} already terminal ({:?}); transitions are irreversible",
                id, advisor.status
            )));
        }

        advisor.status = status;
        if status.is_terminal() {
            self.memory.freeze(id);
        }
        Ok(())
    }

    /// Adjust loyalty with clamping; returns true if the value was clamped
    pub fn adjust_loyalty(&mut self, id: AdvisorId, delta: f32) -> Result<bool> {
        let advisor = self.advisor_mut(id).ok_or_else(|| {
            PoliticsError::DataConsistency(format!("unknown advisor {:?}", id))
        })?;
        let raw = advisor.loyalty + delta;
        advisor.loyalty = raw.clamp(0.0, 1.0);
        Ok(raw != advisor.loyalty)
    }

    /// Adjust influence with clamping; returns true if the value was clamped
    pub fn adjust_influence(&mut self, id: AdvisorId, delta: f32) -> Result<bool> {
        let advisor = self.advisor_mut(id).ok_or_else(|| {
            PoliticsError::DataConsistency(format!("unknown advisor {:?}", id))
        })?;
        let raw = advisor.influence + delta;
        advisor.influence = raw.clamp(0.0, 1.0);
        Ok(raw != advisor.influence)
    }

    /// Adjust the leader's trust in an advisor, clamped to [-1, 1]
    pub fn adjust_leader_trust(&mut self, id: AdvisorId, delta: f32) -> bool {
        let entry = self.leader.trust.entry(id).or_insert(0.0);
        let raw = *entry + delta;
        *entry = raw.clamp(-1.0, 1.0);
        raw != *entry
    }

    /// Defensive strength against a coup: loyal advisors' influence plus
    /// the leader's own security modifier
    pub fn leader_defense(&self, loyal_threshold: f32, exclude: &[AdvisorId]) -> f32 {
        let loyalist_influence: f32 = self
            .active_advisors()
            .filter(|a| a.loyalty >= loyal_threshold && !exclude.contains(&a.id))
            .map(|a| a.influence)
            .sum();
        loyalist_influence + self.leader.security_modifier
    }

    pub fn security_active(&self, turn: Turn) -> bool {
        self.security_until.map_or(false, |until| turn < until)
    }

    /// Replace the leader with a (formerly conspiring) advisor
    ///
    /// The old leader is replaced wholesale; the new leader's trust map is
    /// seeded from their standing relationships, and their old advisor
    /// edges leave the graph.
    pub fn promote_leader(&mut self, id: AdvisorId, turn: Turn) -> Result<()> {
        let idx = self
            .advisors
            .iter()
            .position(|a| a.id == id && a.is_active())
            .ok_or_else(|| {
                PoliticsError::DataConsistency(format!(
                    "cannot crown {:?}: not an active advisor",
                    id
                ))
            })?;
        let crowned = self.advisors.remove(idx);

        let mut trust = AHashMap::new();
        for advisor in self.advisors.iter().filter(|a| a.is_active()) {
            trust.insert(
                advisor.id,
                self.relations
                    .trust(ActorRef::Advisor(id), ActorRef::Advisor(advisor.id)),
            );
        }

        self.relations.remove_actor(ActorRef::Leader);
        self.relations.remove_actor(ActorRef::Advisor(id));

        self.leader = Leader {
            name: crowned.name,
            style: style_from_personality(&crowned.personality),
            personality: crowned.personality,
            trust,
            security_modifier: 1.0,
            reign_started: turn,
        };
        Ok(())
    }

    /// Recompute the political-stability scalar
    ///
    /// Cohesion rises with mean loyalty and falls with loyalty spread,
    /// active-conspiracy pressure and recent crises.
    pub fn recompute_stability(&mut self, conspiracy_pressure: f32, crisis_pressure: f32) {
        let loyalties: Vec<f32> = self.active_advisors().map(|a| a.loyalty).collect();
        if loyalties.is_empty() {
            self.stability = 0.0;
            return;
        }

        let mean = loyalties.iter().sum::<f32>() / loyalties.len() as f32;
        let spread = loyalties.iter().cloned().fold(f32::MIN, f32::max)
            - loyalties.iter().cloned().fold(f32::MAX, f32::min);

        let base = 0.6 * mean + 0.4 * (1.0 - spread);
        self.stability = (base - 0.3 * conspiracy_pressure - 0.2 * crisis_pressure).clamp(0.0, 1.0);
    }
}
