use serde::{Deserialize, Serialize};

use crate::core::types::{AdvisorId, EventId, MemoryId, Turn};

/// Provenance and topic tags on a memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryTag {
    Coup,
    LeaderDecision,
    Conspiracy,
    Crisis,
    Security,
    Appointment,
    Diplomacy,
    /// Copied from another advisor during a hand-off
    SecondHand,
}

impl MemoryTag {
    /// Critical memories are never pruned, no matter how stale
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            MemoryTag::Coup | MemoryTag::LeaderDecision | MemoryTag::Conspiracy
        )
    }
}

/// Payload for a memory about to be written; the store assigns id and turns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDraft {
    pub event: EventId,
    pub content: String,
    /// How this participant experienced the event, in [-1, 1]
    pub emotional_impact: f32,
    /// Trustworthiness of the source chain, in [0, 1]
    pub reliability: f32,
    pub decay_rate: f32,
    pub tags: Vec<MemoryTag>,
}

impl MemoryDraft {
    pub fn new(event: EventId, content: impl Into<String>, emotional_impact: f32, reliability: f32) -> Self {
        Self {
            event,
            content: content.into(),
            emotional_impact: emotional_impact.clamp(-1.0, 1.0),
            reliability: reliability.clamp(0.0, 1.0),
            decay_rate: 0.15,
            tags: Vec::new(),
        }
    }

    pub fn with_decay(mut self, decay_rate: f32) -> Self {
        self.decay_rate = decay_rate.max(0.0);
        self
    }

    pub fn with_tags(mut self, tags: &[MemoryTag]) -> Self {
        self.tags = tags.to_vec();
        self
    }
}

/// A single memory held by one advisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub advisor: AdvisorId,
    pub event: EventId,
    pub content: String,
    /// Set at creation from the originating event; never changed by decay
    pub emotional_impact: f32,
    /// Set at creation from the source chain; degrades only via manipulation
    pub reliability: f32,
    pub decay_rate: f32,
    pub created_turn: Turn,
    /// Refreshed by recall: accessing a memory slows its future decay
    pub last_accessed_turn: Turn,
    pub tags: Vec<MemoryTag>,
}

impl Memory {
    pub fn from_draft(id: MemoryId, advisor: AdvisorId, draft: MemoryDraft, turn: Turn) -> Self {
        Self {
            id,
            advisor,
            event: draft.event,
            content: draft.content,
            emotional_impact: draft.emotional_impact.clamp(-1.0, 1.0),
            reliability: draft.reliability.clamp(0.0, 1.0),
            decay_rate: draft.decay_rate.max(0.0),
            created_turn: turn,
            last_accessed_turn: turn,
            tags: draft.tags,
        }
    }

    /// Time-independent weight: how much this memory matters when fresh
    pub fn base_weight(&self) -> f32 {
        self.emotional_impact.abs() * (0.5 + 0.5 * self.reliability)
    }

    /// Salience after decay over turns since the memory was last accessed
    pub fn effective_salience(&self, current_turn: Turn) -> f32 {
        let idle = current_turn.saturating_sub(self.last_accessed_turn) as f32;
        self.base_weight() * (-self.decay_rate * idle).exp()
    }

    pub fn has_tag(&self, tag: MemoryTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_critical(&self) -> bool {
        self.tags.iter().any(MemoryTag::is_critical)
    }
}
