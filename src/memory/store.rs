use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::error::{PoliticsError, Result};
use crate::core::types::{AdvisorId, MemoryId, Turn};
use crate::memory::record::{Memory, MemoryDraft, MemoryTag};

/// Per-civilization memory store, indexed by owning advisor
///
/// Advisors must be registered before memories can be written for them.
/// Freezing an advisor (terminal status) rejects further writes while
/// keeping existing memories readable, so a dead advisor's knowledge can
/// still be handed off to a successor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    memories: AHashMap<AdvisorId, Vec<Memory>>,
    frozen: AHashSet<AdvisorId>,
    next_id: u64,
    /// Guard against double-decay within a single turn
    last_decay: AHashMap<AdvisorId, Turn>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, advisor: AdvisorId) {
        self.memories.entry(advisor).or_default();
    }

    pub fn is_registered(&self, advisor: AdvisorId) -> bool {
        self.memories.contains_key(&advisor)
    }

    /// Reject future writes for a terminal-status advisor
    pub fn freeze(&mut self, advisor: AdvisorId) {
        self.frozen.insert(advisor);
    }

    pub fn is_frozen(&self, advisor: AdvisorId) -> bool {
        self.frozen.contains(&advisor)
    }

    /// Write a memory; fails if the advisor is unknown or terminal-status
    pub fn store(&mut self, advisor: AdvisorId, draft: MemoryDraft, turn: Turn) -> Result<MemoryId> {
        if self.frozen.contains(&advisor) {
            return Err(PoliticsError::DataConsistency(format!(
                "invalid advisor: {:?} is terminal-status, memory writes are frozen",
                advisor
            )));
        }
        let slot = self.memories.get_mut(&advisor).ok_or_else(|| {
            PoliticsError::DataConsistency(format!("invalid advisor: {:?} is not registered", advisor))
        })?;

        let id = MemoryId(self.next_id);
        self.next_id += 1;
        slot.push(Memory::from_draft(id, advisor, draft, turn));
        Ok(id)
    }

    /// Recall memories above a salience floor, most salient first
    ///
    /// Ties break by recency. Every recalled memory has its
    /// `last_accessed_turn` refreshed, which slows its future decay: the
    /// "use it or lose it" mechanic. The returned sequence is finite and
    /// restartable.
    pub fn recall(
        &mut self,
        advisor: AdvisorId,
        tag_filter: Option<MemoryTag>,
        min_salience: f32,
        turn: Turn,
    ) -> RecallIter {
        let Some(slot) = self.memories.get_mut(&advisor) else {
            return RecallIter::empty();
        };

        // Rank by pre-refresh salience so the decay ordering is what the
        // caller observes, then refresh access times.
        let mut ranked: Vec<(f32, usize)> = slot
            .iter()
            .enumerate()
            .filter(|(_, m)| tag_filter.map_or(true, |tag| m.has_tag(tag)))
            .map(|(i, m)| (m.effective_salience(turn), i))
            .filter(|(salience, _)| *salience >= min_salience)
            .collect();

        ranked.sort_by(|(sa, ia), (sb, ib)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let (ma, mb) = (&slot[*ia], &slot[*ib]);
                    mb.created_turn
                        .cmp(&ma.created_turn)
                        .then(mb.id.cmp(&ma.id))
                })
        });

        let items = ranked
            .into_iter()
            .map(|(_, i)| {
                slot[i].last_accessed_turn = turn;
                slot[i].clone()
            })
            .collect();

        RecallIter::new(items)
    }

    /// Decay one advisor's memories, pruning those below the floor
    ///
    /// Idempotent within a turn: repeated calls without a turn advance do
    /// nothing. Memories accessed this turn and critical-tagged memories
    /// are never pruned.
    pub fn decay(&mut self, advisor: AdvisorId, turn: Turn, prune_floor: f32) -> usize {
        if self.last_decay.get(&advisor) == Some(&turn) {
            return 0;
        }
        self.last_decay.insert(advisor, turn);

        let Some(slot) = self.memories.get_mut(&advisor) else {
            return 0;
        };

        let before = slot.len();
        slot.retain(|m| {
            m.is_critical()
                || m.last_accessed_turn == turn
                || m.effective_salience(turn) >= prune_floor
        });
        before - slot.len()
    }

    /// Decay every registered advisor, returning the total pruned
    pub fn decay_all(&mut self, turn: Turn, prune_floor: f32) -> usize {
        let advisors: Vec<AdvisorId> = self.memories.keys().copied().collect();
        advisors
            .into_iter()
            .map(|a| self.decay(a, turn, prune_floor))
            .sum()
    }

    /// Copy filtered memories to another advisor as second-hand knowledge
    ///
    /// Copies carry reliability × `discount` (strictly degraded) and the
    /// `SecondHand` tag. The source may be terminal (a dead advisor's
    /// files handed to a successor); the target must accept writes.
    pub fn transfer(
        &mut self,
        from: AdvisorId,
        to: AdvisorId,
        tag_filter: Option<MemoryTag>,
        discount: f32,
        turn: Turn,
    ) -> Result<usize> {
        if !self.memories.contains_key(&from) {
            return Err(PoliticsError::DataConsistency(format!(
                "invalid advisor: transfer source {:?} is not registered",
                from
            )));
        }
        if self.frozen.contains(&to) || !self.memories.contains_key(&to) {
            return Err(PoliticsError::DataConsistency(format!(
                "invalid advisor: transfer target {:?} cannot accept memories",
                to
            )));
        }

        let copies: Vec<MemoryDraft> = self.memories[&from]
            .iter()
            .filter(|m| tag_filter.map_or(true, |tag| m.has_tag(tag)))
            .map(|m| {
                let mut tags = m.tags.clone();
                if !tags.contains(&MemoryTag::SecondHand) {
                    tags.push(MemoryTag::SecondHand);
                }
                MemoryDraft {
                    event: m.event,
                    content: m.content.clone(),
                    emotional_impact: m.emotional_impact,
                    reliability: m.reliability * discount,
                    decay_rate: m.decay_rate,
                    tags,
                }
            })
            .collect();

        let count = copies.len();
        for draft in copies {
            self.store(to, draft, turn)?;
        }
        Ok(count)
    }

    /// Explicit manipulation: degrade a memory's reliability and optionally
    /// rewrite its content
    ///
    /// This is the only path by which reliability changes after creation.
    pub fn tamper(
        &mut self,
        advisor: AdvisorId,
        memory: MemoryId,
        reliability_factor: f32,
        content: Option<String>,
    ) -> Result<()> {
        let slot = self.memories.get_mut(&advisor).ok_or_else(|| {
            PoliticsError::DataConsistency(format!("invalid advisor: {:?} is not registered", advisor))
        })?;
        let target = slot.iter_mut().find(|m| m.id == memory).ok_or_else(|| {
            PoliticsError::DataConsistency(format!("memory {:?} not found for {:?}", memory, advisor))
        })?;

        target.reliability = (target.reliability * reliability_factor.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        if let Some(content) = content {
            target.content = content;
        }
        Ok(())
    }

    pub fn memories_of(&self, advisor: AdvisorId) -> &[Memory] {
        self.memories.get(&advisor).map_or(&[], Vec::as_slice)
    }

    pub fn count(&self, advisor: AdvisorId) -> usize {
        self.memories.get(&advisor).map_or(0, Vec::len)
    }
}

/// Finite, restartable recall sequence, most salient first
#[derive(Debug, Clone)]
pub struct RecallIter {
    items: Vec<Memory>,
    pos: usize,
}

impl RecallIter {
    fn new(items: Vec<Memory>) -> Self {
        Self { items, pos: 0 }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Rewind to the start without re-querying the store
    pub fn restart(&mut self) {
        self.pos = 0;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Memory] {
        &self.items
    }
}

impl Iterator for RecallIter {
    type Item = Memory;

    fn next(&mut self) -> Option<Memory> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}
