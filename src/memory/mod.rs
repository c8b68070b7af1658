//! Per-advisor memory: timestamped records with decay, reliability and
//! provenance
//!
//! The store is the leaf dependency for decision-making and conspiracy
//! detection. Decay reduces effective salience only; reliability degrades
//! solely through explicit manipulation (hand-off discounts, tampering),
//! never through the passage of turns.

mod record;
mod store;

pub use record::{Memory, MemoryDraft, MemoryTag};
pub use store::{MemoryStore, RecallIter};
