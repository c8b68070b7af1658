//! Court Intrigue - Political Simulation Engine
//!
//! Simulates the internal political life of AI-controlled factions in a
//! turn-based strategy game: advisors with personalities and decaying
//! memories, trust relationships, rule-based (optionally LLM-assisted)
//! advice and decisions, and conspiracies that can depose a leader.

pub mod civilization;
pub mod conspiracy;
pub mod core;
pub mod decision;
pub mod events;
pub mod llm;
pub mod memory;
pub mod personality;
pub mod relations;
pub mod snapshot;
pub mod turn;
