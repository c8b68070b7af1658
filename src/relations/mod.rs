//! Directed trust/influence graph between political actors
//!
//! Edges are directed and independent: A's trust of B says nothing about
//! B's trust of A. A missing edge reads as neutral. Edges drift toward
//! neutral each turn; event-driven deltas are applied afterwards so they
//! dominate over drift.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{ActorRef, Turn};
use crate::personality::Personality;

/// One directed edge in the relationship graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Trust in [-1, 1]
    pub trust: f32,
    /// Influence weight in [0, 1]
    pub influence_weight: f32,
    pub last_updated: Turn,
}

impl RelationshipEdge {
    fn neutral(turn: Turn) -> Self {
        Self {
            trust: 0.0,
            influence_weight: 0.0,
            last_updated: turn,
        }
    }
}

/// Per-civilization relationship graph
///
/// Serialized as a flat edge list: JSON maps cannot key on actor pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphSnapshot", into = "GraphSnapshot")]
pub struct RelationshipGraph {
    edges: AHashMap<(ActorRef, ActorRef), RelationshipEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeRecord {
    from: ActorRef,
    to: ActorRef,
    trust: f32,
    influence_weight: f32,
    last_updated: Turn,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphSnapshot {
    edges: Vec<EdgeRecord>,
}

fn actor_sort_key(actor: ActorRef) -> (u8, u32) {
    match actor {
        ActorRef::Leader => (0, 0),
        ActorRef::Advisor(id) => (1, id.0),
    }
}

impl From<RelationshipGraph> for GraphSnapshot {
    fn from(graph: RelationshipGraph) -> Self {
        let mut edges: Vec<EdgeRecord> = graph
            .edges
            .into_iter()
            .map(|((from, to), edge)| EdgeRecord {
                from,
                to,
                trust: edge.trust,
                influence_weight: edge.influence_weight,
                last_updated: edge.last_updated,
            })
            .collect();
        edges.sort_by_key(|e| (actor_sort_key(e.from), actor_sort_key(e.to)));
        Self { edges }
    }
}

impl From<GraphSnapshot> for RelationshipGraph {
    fn from(snapshot: GraphSnapshot) -> Self {
        let edges = snapshot
            .edges
            .into_iter()
            .map(|record| {
                (
                    (record.from, record.to),
                    RelationshipEdge {
                        trust: record.trust,
                        influence_weight: record.influence_weight,
                        last_updated: record.last_updated,
                    },
                )
            })
            .collect();
        Self { edges }
    }
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust of `a` toward `b`; neutral (0.0) when no edge exists
    pub fn trust(&self, a: ActorRef, b: ActorRef) -> f32 {
        self.edges.get(&(a, b)).map_or(0.0, |e| e.trust)
    }

    /// The stronger trust direction between two actors
    ///
    /// Conspiracy membership requires trust above a threshold in at least
    /// one direction for every member pair.
    pub fn mutual_trust(&self, a: ActorRef, b: ActorRef) -> f32 {
        self.trust(a, b).max(self.trust(b, a))
    }

    pub fn influence_weight(&self, a: ActorRef, b: ActorRef) -> f32 {
        self.edges.get(&(a, b)).map_or(0.0, |e| e.influence_weight)
    }

    /// Apply deltas to an edge, clamping into valid ranges
    ///
    /// Returns true if either value had to be clamped: the caller counts
    /// those for diagnostics. A clamped delta is an absorbed invariant
    /// violation, never an error.
    pub fn apply_delta(
        &mut self,
        a: ActorRef,
        b: ActorRef,
        trust_delta: f32,
        influence_delta: f32,
        turn: Turn,
    ) -> bool {
        let edge = self
            .edges
            .entry((a, b))
            .or_insert_with(|| RelationshipEdge::neutral(turn));

        let raw_trust = edge.trust + trust_delta;
        let raw_influence = edge.influence_weight + influence_delta;

        edge.trust = raw_trust.clamp(-1.0, 1.0);
        edge.influence_weight = raw_influence.clamp(0.0, 1.0);
        edge.last_updated = turn;

        let clamped = raw_trust != edge.trust || raw_influence != edge.influence_weight;
        if clamped {
            tracing::warn!(
                ?a,
                ?b,
                raw_trust,
                raw_influence,
                "relationship delta clamped into range"
            );
        }
        clamped
    }

    /// Set an edge outright (initialization and tests)
    pub fn set(&mut self, a: ActorRef, b: ActorRef, trust: f32, influence_weight: f32, turn: Turn) {
        self.edges.insert(
            (a, b),
            RelationshipEdge {
                trust: trust.clamp(-1.0, 1.0),
                influence_weight: influence_weight.clamp(0.0, 1.0),
                last_updated: turn,
            },
        );
    }

    /// Move every edge's trust a fixed fraction toward neutral
    ///
    /// Called once per turn before event processing.
    pub fn decay_all(&mut self, fraction: f32, turn: Turn) {
        for edge in self.edges.values_mut() {
            edge.trust -= edge.trust * fraction;
            edge.last_updated = turn;
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges originating at `a`, for snapshots and prompt context
    pub fn edges_from(&self, a: ActorRef) -> impl Iterator<Item = (ActorRef, &RelationshipEdge)> {
        self.edges
            .iter()
            .filter(move |((from, _), _)| *from == a)
            .map(|((_, to), edge)| (*to, edge))
    }

    /// Remove edges touching an actor (roster cleanup after purges)
    pub fn remove_actor(&mut self, actor: ActorRef) {
        self.edges
            .retain(|(from, to), _| *from != actor && *to != actor);
    }
}

/// Deterministic trust delta for two advisors sharing an event
///
/// Closer personalities sharing a positive event grow trust; opposed
/// personalities sharing a negative event lose it fastest. `valence` is
/// the event's tone in [-1, 1]; `gain` scales the result.
pub fn interaction_delta(a: &Personality, b: &Personality, valence: f32, gain: f32) -> f32 {
    let affinity = (1.0 + a.compatibility(b)) / 2.0; // 0..1
    let valence = valence.clamp(-1.0, 1.0);
    if valence >= 0.0 {
        valence * affinity * gain
    } else {
        valence * (1.0 - affinity) * gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AdvisorId;
    use crate::personality::Ideology;

    fn adv(n: u32) -> ActorRef {
        ActorRef::Advisor(AdvisorId(n))
    }

    #[test]
    fn test_missing_edge_is_neutral() {
        let graph = RelationshipGraph::new();
        assert_eq!(graph.trust(adv(1), adv(2)), 0.0);
        assert_eq!(graph.influence_weight(adv(1), adv(2)), 0.0);
    }

    #[test]
    fn test_edges_are_directed() {
        let mut graph = RelationshipGraph::new();
        graph.set(adv(1), adv(2), 0.8, 0.5, 0);
        assert_eq!(graph.trust(adv(1), adv(2)), 0.8);
        assert_eq!(graph.trust(adv(2), adv(1)), 0.0);
        assert_eq!(graph.mutual_trust(adv(2), adv(1)), 0.8);
    }

    #[test]
    fn test_apply_delta_clamps() {
        let mut graph = RelationshipGraph::new();
        graph.set(adv(1), adv(2), 0.9, 0.9, 0);

        let clamped = graph.apply_delta(adv(1), adv(2), 0.5, 0.5, 1);
        assert!(clamped);
        assert_eq!(graph.trust(adv(1), adv(2)), 1.0);
        assert_eq!(graph.influence_weight(adv(1), adv(2)), 1.0);

        let clamped_low = graph.apply_delta(adv(1), adv(2), -3.0, -2.0, 2);
        assert!(clamped_low);
        assert_eq!(graph.trust(adv(1), adv(2)), -1.0);
        assert_eq!(graph.influence_weight(adv(1), adv(2)), 0.0);
    }

    #[test]
    fn test_apply_delta_in_range_not_clamped() {
        let mut graph = RelationshipGraph::new();
        let clamped = graph.apply_delta(adv(1), adv(2), 0.3, 0.2, 1);
        assert!(!clamped);
    }

    #[test]
    fn test_decay_moves_toward_neutral() {
        let mut graph = RelationshipGraph::new();
        graph.set(adv(1), adv(2), 0.8, 0.5, 0);
        graph.set(adv(2), adv(1), -0.6, 0.5, 0);

        graph.decay_all(0.1, 1);
        assert!((graph.trust(adv(1), adv(2)) - 0.72).abs() < 1e-6);
        assert!((graph.trust(adv(2), adv(1)) - -0.54).abs() < 1e-6);
    }

    #[test]
    fn test_decay_leaves_influence_alone() {
        let mut graph = RelationshipGraph::new();
        graph.set(adv(1), adv(2), 0.8, 0.5, 0);
        graph.decay_all(0.1, 1);
        assert_eq!(graph.influence_weight(adv(1), adv(2)), 0.5);
    }

    #[test]
    fn test_remove_actor_drops_both_directions() {
        let mut graph = RelationshipGraph::new();
        graph.set(adv(1), adv(2), 0.8, 0.5, 0);
        graph.set(adv(2), adv(1), 0.4, 0.5, 0);
        graph.set(adv(2), adv(3), 0.4, 0.5, 0);

        graph.remove_actor(adv(1));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.trust(adv(2), adv(3)), 0.4);
    }

    #[test]
    fn test_graph_serde_round_trip() {
        let mut graph = RelationshipGraph::new();
        graph.set(adv(1), ActorRef::Leader, 0.5, 0.3, 2);
        graph.set(adv(2), adv(1), -0.4, 0.1, 2);

        let json = serde_json::to_string(&graph).unwrap();
        let back: RelationshipGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn test_interaction_delta_deterministic() {
        let a = Personality::new(0.5, 0.5, 0.3, 0.5, Ideology::Mercantile);
        let b = Personality::new(0.6, 0.4, 0.2, 0.5, Ideology::Mercantile);
        let d1 = interaction_delta(&a, &b, 0.5, 0.2);
        let d2 = interaction_delta(&a, &b, 0.5, 0.2);
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_close_allies_positive_event_gain_trust() {
        let a = Personality::new(0.5, 0.5, 0.3, 0.5, Ideology::Mercantile);
        let b = Personality::new(0.55, 0.5, 0.25, 0.5, Ideology::Mercantile);
        assert!(interaction_delta(&a, &b, 0.8, 0.2) > 0.0);
    }

    #[test]
    fn test_opposed_negative_event_lose_trust_faster() {
        let close_a = Personality::new(0.5, 0.5, 0.3, 0.5, Ideology::Mercantile);
        let close_b = Personality::new(0.55, 0.5, 0.25, 0.5, Ideology::Mercantile);
        let opposed = Personality::new(1.0, 0.5, 1.0, 0.0, Ideology::Theocratic);

        let close_loss = interaction_delta(&close_a, &close_b, -0.8, 0.2);
        let opposed_loss = interaction_delta(&close_a, &opposed, -0.8, 0.2);
        assert!(close_loss <= 0.0);
        assert!(opposed_loss < close_loss, "ideological opponents fall out harder");
    }
}
