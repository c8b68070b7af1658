//! Advisor advice and leader decisions
//!
//! The default path is rule-based and fully deterministic. An optional
//! generative backend can substitute for scoring; its responses are
//! validated structurally and any timeout or malformed response falls
//! back to the rule-based path for that single call. The fallback is the
//! engine's primary reliability safeguard.
//!
//! Nothing in this module can read conspiracy state: the leader's query
//! path is structurally blind to plots until a discovery event.

mod context;
mod engine;

pub use context::{Advice, Decision, DecisionContext, PolicyOption};
pub use engine::{
    advise, advise_from_recall, advise_with_capability, decide, decision_event, gather_advice,
    prepare_query, PreparedQuery,
};
