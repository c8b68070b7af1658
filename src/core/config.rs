//! Engine configuration with documented constants
//!
//! All tuning knobs are collected here with explanations of their purpose
//! and how they interact with each other.

/// Configuration for the political simulation engine
///
/// These values have been tuned to produce coherent emergent court politics.
/// Changing them will affect how quickly loyalty erodes, how often
/// conspiracies form, and how survivable coups are.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // === MEMORY ===
    /// Effective-salience floor below which a non-critical memory is pruned
    ///
    /// Salience = base_weight(emotional_impact, reliability) ×
    /// exp(−decay_rate × turns_since_last_access). Memories recalled this
    /// turn are never pruned (reinforcement), and critical-tagged memories
    /// (coup- or leader-decision-related) are never pruned at all.
    pub memory_prune_floor: f32,

    /// Default per-turn decay rate for newly written memories
    ///
    /// At 0.15, an untouched memory loses ~14% of its salience per turn
    /// and typically falls below the prune floor within 15-20 turns.
    pub memory_decay_rate: f32,

    /// Minimum effective salience for a memory to surface during recall
    pub recall_min_salience: f32,

    /// Reliability multiplier applied to transferred (second-hand) memories
    ///
    /// Must be < 1.0 so a copy is always strictly less reliable than the
    /// original it was made from.
    pub transfer_reliability_discount: f32,

    // === RELATIONSHIPS ===
    /// Fraction by which every trust edge moves toward neutral per turn
    ///
    /// Applied once per turn before event processing, so event-driven
    /// deltas dominate over drift.
    pub relation_decay_fraction: f32,

    /// Scale for trust deltas when two advisors co-participate in an event
    pub interaction_trust_gain: f32,

    // === PERSONALITY ===
    /// Hard cap on personality drift magnitude per trait per turn
    ///
    /// Required invariant: prevents runaway feedback loops where betrayal
    /// breeds corruption breeds betrayal within a handful of turns.
    pub drift_cap_per_turn: f32,

    // === CONSPIRACY ===
    /// Loyalty below this threshold makes an advisor a conspiracy candidate
    pub low_loyalty_threshold: f32,

    /// Trust (in at least one direction) required for a conspiracy invitation
    pub conspiracy_trust_threshold: f32,

    /// Loyalty above this threshold counts as recovered; a conspiracy whose
    /// every member has recovered dissolves
    pub loyalty_recovery_threshold: f32,

    /// Secrecy loss per member beyond the founding pair
    ///
    /// More members leak more easily.
    pub secrecy_member_penalty: f32,

    /// Combined influence must exceed leader defense × this ratio to attempt
    pub attempt_strength_ratio: f32,

    /// Secrecy at or below this value guarantees detection: the leader
    /// preempts and the attempt fails before any probability roll
    pub guaranteed_detection_secrecy: f32,

    /// Scale for the pre-roll detection chance, (1 − secrecy) × scale
    pub detection_chance_scale: f32,

    /// Coup success probability = influence ratio × (base + gain × secrecy),
    /// capped below certainty
    pub coup_success_secrecy_base: f32,
    pub coup_success_secrecy_gain: f32,
    pub coup_success_cap: f32,

    /// Turns the civilization-wide security crackdown lasts after a failed coup
    pub security_cooldown_turns: u64,

    /// Added to the detection threshold and chance while a crackdown is active
    pub security_detection_bonus: f32,

    /// Loyalty/influence penalties applied to members of a failed coup
    pub failed_coup_loyalty_penalty: f32,
    pub failed_coup_influence_penalty: f32,

    /// Loyalty/influence penalties applied to old-guard loyalists after a
    /// successful coup (purge risk)
    pub purge_loyalty_penalty: f32,
    pub purge_influence_penalty: f32,

    // === DECISIONS ===
    /// Loyalty penalty for an advisor whose advice the leader overrode
    /// against a negative-valence majority
    pub override_loyalty_penalty: f32,

    /// Hard timeout for one generative-backend call, in milliseconds
    ///
    /// On expiry the call is treated as failed and the rule-based path
    /// answers instead; the turn never blocks on the backend.
    pub backend_timeout_ms: u64,

    // === TURN ===
    /// Maximum events processed in one turn, counting cascades
    ///
    /// Backstop against follow-on loops; overflow is dropped and logged
    /// as a data-consistency fault.
    pub max_events_per_turn: usize,

    /// Master seed for reproducible coup resolution
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Memory
            memory_prune_floor: 0.05,
            memory_decay_rate: 0.15,
            recall_min_salience: 0.05,
            transfer_reliability_discount: 0.7,

            // Relationships
            relation_decay_fraction: 0.05,
            interaction_trust_gain: 0.2,

            // Personality
            drift_cap_per_turn: 0.02,

            // Conspiracy (thresholds match the scenario contract:
            // loyalty 0.15 < 0.2 and trust 0.8 > 0.6 conspire within a turn)
            low_loyalty_threshold: 0.2,
            conspiracy_trust_threshold: 0.6,
            loyalty_recovery_threshold: 0.45,
            secrecy_member_penalty: 0.1,
            attempt_strength_ratio: 1.0,
            guaranteed_detection_secrecy: 0.1,
            detection_chance_scale: 0.25,
            coup_success_secrecy_base: 0.85,
            coup_success_secrecy_gain: 0.3,
            coup_success_cap: 0.95,
            security_cooldown_turns: 10,
            security_detection_bonus: 0.15,
            failed_coup_loyalty_penalty: 0.3,
            failed_coup_influence_penalty: 0.3,
            purge_loyalty_penalty: 0.15,
            purge_influence_penalty: 0.1,

            // Decisions
            override_loyalty_penalty: 0.05,
            backend_timeout_ms: 1500,

            // Turn
            max_events_per_turn: 256,
            seed: 12345,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.transfer_reliability_discount >= 1.0 || self.transfer_reliability_discount < 0.0 {
            return Err(format!(
                "transfer_reliability_discount ({}) must be in [0, 1)",
                self.transfer_reliability_discount
            ));
        }

        if self.low_loyalty_threshold >= self.loyalty_recovery_threshold {
            return Err(format!(
                "low_loyalty_threshold ({}) should be < loyalty_recovery_threshold ({})",
                self.low_loyalty_threshold, self.loyalty_recovery_threshold
            ));
        }

        if !(0.0..=1.0).contains(&self.conspiracy_trust_threshold) {
            return Err(format!(
                "conspiracy_trust_threshold ({}) must be in [0, 1]",
                self.conspiracy_trust_threshold
            ));
        }

        if self.guaranteed_detection_secrecy >= self.conspiracy_trust_threshold {
            return Err(format!(
                "guaranteed_detection_secrecy ({}) should be well below conspiracy_trust_threshold ({})",
                self.guaranteed_detection_secrecy, self.conspiracy_trust_threshold
            ));
        }

        if self.coup_success_cap > 1.0 || self.coup_success_cap <= 0.0 {
            return Err(format!(
                "coup_success_cap ({}) must be in (0, 1]",
                self.coup_success_cap
            ));
        }

        if self.memory_decay_rate < 0.0 {
            return Err("memory_decay_rate must be non-negative".into());
        }

        if !(0.0..=1.0).contains(&self.relation_decay_fraction) {
            return Err(format!(
                "relation_decay_fraction ({}) must be in [0, 1]",
                self.relation_decay_fraction
            ));
        }

        if self.drift_cap_per_turn <= 0.0 || self.drift_cap_per_turn > 0.1 {
            return Err(format!(
                "drift_cap_per_turn ({}) must be in (0, 0.1]: larger caps allow runaway feedback",
                self.drift_cap_per_turn
            ));
        }

        if self.max_events_per_turn == 0 {
            return Err("max_events_per_turn must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let config = EngineConfig {
            low_loyalty_threshold: 0.5,
            loyalty_recovery_threshold: 0.4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transfer_discount_must_discount() {
        let config = EngineConfig {
            transfer_reliability_discount: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drift_cap_bounded() {
        let config = EngineConfig {
            drift_cap_per_turn: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
