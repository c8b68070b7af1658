//! History log of applied political events

use serde::{Deserialize, Serialize};

use crate::core::types::{AdvisorId, Turn};
use crate::events::PoliticalEvent;

/// The complete record of applied events, in application order
///
/// Events land here only after their consequences have been applied, so
/// everything in the log is settled history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    pub events: Vec<PoliticalEvent>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: PoliticalEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events_for_turn(&self, turn: Turn) -> impl Iterator<Item = &PoliticalEvent> {
        self.events.iter().filter(move |e| e.turn == turn)
    }

    pub fn events_for_advisor(&self, advisor: AdvisorId) -> impl Iterator<Item = &PoliticalEvent> {
        self.events
            .iter()
            .filter(move |e| e.participants.contains(&advisor))
    }
}
