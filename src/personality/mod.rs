//! Personality model: trait vectors, compatibility, capped drift
//!
//! Traits are immutable after creation except for slow drift applied by the
//! event pipeline under sustained pressure. Drift is a pure function of
//! current state + pressure, and its per-turn magnitude is hard-capped.
//! Archetypes load from TOML under `data/personalities/`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::core::error::{PoliticsError, Result};

/// Categorical ideology marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ideology {
    Traditionalist,
    Expansionist,
    Mercantile,
    Theocratic,
    Reformist,
}

impl Default for Ideology {
    fn default() -> Self {
        Self::Traditionalist
    }
}

/// Static trait vector for an advisor or leader (each scalar in 0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Hunger for power and standing
    pub ambition: f32,
    /// Natural inclination toward loyalty, before events push it around
    pub loyalty_baseline: f32,
    /// Willingness to bend rules for personal gain
    pub corruption: f32,
    /// Preference for workable outcomes over principle
    pub pragmatism: f32,
    /// Categorical ideology marker
    #[serde(default)]
    pub ideology: Ideology,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            ambition: 0.5,
            loyalty_baseline: 0.5,
            corruption: 0.2,
            pragmatism: 0.5,
            ideology: Ideology::Traditionalist,
        }
    }
}

impl Personality {
    pub fn new(
        ambition: f32,
        loyalty_baseline: f32,
        corruption: f32,
        pragmatism: f32,
        ideology: Ideology,
    ) -> Self {
        Self {
            ambition: ambition.clamp(0.0, 1.0),
            loyalty_baseline: loyalty_baseline.clamp(0.0, 1.0),
            corruption: corruption.clamp(0.0, 1.0),
            pragmatism: pragmatism.clamp(0.0, 1.0),
            ideology,
        }
    }

    /// Compatibility between two personalities, in [-1, 1]
    ///
    /// Deterministic: consumed by relationship deltas and conspiracy
    /// formation, both of which need reproducible tests.
    pub fn compatibility(&self, other: &Personality) -> f32 {
        let trait_distance = ((self.ambition - other.ambition).abs()
            + (self.corruption - other.corruption).abs()
            + (self.pragmatism - other.pragmatism).abs())
            / 3.0;

        let ideology_term = if self.ideology == other.ideology {
            0.25
        } else {
            -0.25
        };

        ((1.0 - 2.0 * trait_distance) * 0.75 + ideology_term).clamp(-1.0, 1.0)
    }

    /// One-line summary for prompts and diagnostics
    pub fn summary(&self) -> String {
        format!(
            "ambition {:.2}, loyalty baseline {:.2}, corruption {:.2}, pragmatism {:.2}, {:?}",
            self.ambition, self.loyalty_baseline, self.corruption, self.pragmatism, self.ideology
        )
    }
}

/// Desired per-trait drift for one turn, before capping
///
/// Produced by the event pipeline (e.g. repeated betrayal pressures
/// corruption upward); applied through [`drift`] which enforces the cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftPressure {
    pub ambition: f32,
    pub loyalty_baseline: f32,
    pub corruption: f32,
    pub pragmatism: f32,
}

/// Apply capped drift, returning the new personality
///
/// Pure function: no hidden mutation order dependencies, so property tests
/// can drive it with arbitrary pressures. Each trait moves by at most
/// `cap` per call and stays clamped to [0, 1]. Ideology never drifts.
pub fn drift(current: &Personality, pressure: &DriftPressure, cap: f32) -> Personality {
    let step = |value: f32, delta: f32| (value + delta.clamp(-cap, cap)).clamp(0.0, 1.0);

    Personality {
        ambition: step(current.ambition, pressure.ambition),
        loyalty_baseline: step(current.loyalty_baseline, pressure.loyalty_baseline),
        corruption: step(current.corruption, pressure.corruption),
        pragmatism: step(current.pragmatism, pressure.pragmatism),
        ideology: current.ideology,
    }
}

/// Load a personality archetype from TOML
///
/// Loads from `data/personalities/{name}.toml`
pub fn load_archetype(name: &str) -> Result<Personality> {
    let path = archetype_path(name);

    let contents = fs::read_to_string(&path).map_err(|e| {
        PoliticsError::DataConsistency(format!("failed to read archetype {:?}: {}", path, e))
    })?;

    let personality: Personality = toml::from_str(&contents).map_err(|e| {
        PoliticsError::DataConsistency(format!("failed to parse archetype TOML: {}", e))
    })?;

    Ok(Personality::new(
        personality.ambition,
        personality.loyalty_baseline,
        personality.corruption,
        personality.pragmatism,
        personality.ideology,
    ))
}

fn archetype_path(name: &str) -> PathBuf {
    PathBuf::from("data/personalities").join(format!("{}.toml", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_traits() {
        let p = Personality::new(1.5, -0.2, 0.5, 0.5, Ideology::Reformist);
        assert_eq!(p.ambition, 1.0);
        assert_eq!(p.loyalty_baseline, 0.0);
    }

    #[test]
    fn test_compatibility_symmetric() {
        let a = Personality::new(0.8, 0.3, 0.6, 0.4, Ideology::Expansionist);
        let b = Personality::new(0.2, 0.7, 0.1, 0.9, Ideology::Traditionalist);
        assert!((a.compatibility(&b) - b.compatibility(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_compatibility_identical_is_high() {
        let a = Personality::new(0.5, 0.5, 0.5, 0.5, Ideology::Mercantile);
        let score = a.compatibility(&a);
        assert!(score > 0.9, "identical personalities should score near 1.0, got {}", score);
    }

    #[test]
    fn test_compatibility_opposed_is_negative() {
        let a = Personality::new(1.0, 0.5, 1.0, 1.0, Ideology::Theocratic);
        let b = Personality::new(0.0, 0.5, 0.0, 0.0, Ideology::Reformist);
        assert!(a.compatibility(&b) < 0.0);
    }

    #[test]
    fn test_drift_respects_cap() {
        let p = Personality::default();
        let pressure = DriftPressure {
            corruption: 0.9, // way over the cap
            ..Default::default()
        };
        let drifted = drift(&p, &pressure, 0.02);
        assert!((drifted.corruption - (p.corruption + 0.02)).abs() < 1e-6);
    }

    #[test]
    fn test_drift_clamps_to_unit_range() {
        let p = Personality::new(0.01, 0.5, 0.99, 0.5, Ideology::Traditionalist);
        let pressure = DriftPressure {
            ambition: -0.5,
            corruption: 0.5,
            ..Default::default()
        };
        let drifted = drift(&p, &pressure, 0.05);
        assert!(drifted.ambition >= 0.0);
        assert!(drifted.corruption <= 1.0);
    }

    #[test]
    fn test_drift_never_changes_ideology() {
        let p = Personality::new(0.5, 0.5, 0.5, 0.5, Ideology::Theocratic);
        let pressure = DriftPressure {
            ambition: 1.0,
            loyalty_baseline: -1.0,
            corruption: 1.0,
            pragmatism: -1.0,
        };
        let drifted = drift(&p, &pressure, 0.02);
        assert_eq!(drifted.ideology, Ideology::Theocratic);
    }

    #[test]
    fn test_drift_is_pure() {
        let p = Personality::default();
        let pressure = DriftPressure {
            corruption: 0.01,
            ..Default::default()
        };
        let a = drift(&p, &pressure, 0.02);
        let b = drift(&p, &pressure, 0.02);
        assert_eq!(a, b);
        assert_eq!(p.corruption, 0.2); // input untouched
    }

    #[test]
    fn test_load_default_archetype() {
        let p = load_archetype("default").expect("should load default archetype");
        assert!(p.ambition >= 0.0 && p.ambition <= 1.0);
    }

    #[test]
    fn test_load_schemer_archetype() {
        let p = load_archetype("schemer").expect("should load schemer archetype");
        assert!(p.ambition > 0.5, "schemers should be ambitious");
        assert!(p.loyalty_baseline < 0.5, "schemers should not be naturally loyal");
    }

    #[test]
    fn test_load_missing_archetype_errors() {
        assert!(load_archetype("no-such-archetype").is_err());
    }
}
