//! Integration tests for the political simulation engine
//!
//! These tests verify the core loop works end-to-end:
//! - Memory storage, recall reinforcement, decay and hand-off
//! - Turn orchestration and the game-layer result contract
//! - Stability responding to political weather
//! - Snapshot round-trips

use court_intrigue::civilization::{Civilization, Leader};
use court_intrigue::core::config::EngineConfig;
use court_intrigue::core::types::{AdvisorId, AdvisorRole, CivId, LeadershipStyle};
use court_intrigue::events::EventKind;
use court_intrigue::memory::MemoryDraft;
use court_intrigue::personality::{Ideology, Personality};
use court_intrigue::snapshot;
use court_intrigue::turn::Court;

fn full_court() -> Court {
    let leader = Leader::new(
        "Queen Maret",
        Personality::new(0.5, 0.7, 0.2, 0.6, Ideology::Traditionalist),
        LeadershipStyle::Collegial,
    );
    let mut civ = Civilization::new(CivId(1), "Valdoria", leader);
    civ.appoint(
        "General Ash",
        AdvisorRole::Military,
        Personality::new(0.7, 0.5, 0.3, 0.3, Ideology::Expansionist),
        0,
    );
    civ.appoint(
        "Treasurer Brel",
        AdvisorRole::Economic,
        Personality::new(0.4, 0.6, 0.3, 0.7, Ideology::Mercantile),
        0,
    );
    civ.appoint(
        "Envoy Seren",
        AdvisorRole::Diplomatic,
        Personality::new(0.3, 0.7, 0.1, 0.8, Ideology::Reformist),
        0,
    );
    civ.appoint(
        "Warden Cora",
        AdvisorRole::Security,
        Personality::new(0.2, 0.9, 0.1, 0.6, Ideology::Traditionalist),
        0,
    );
    Court::new(civ, 2024)
}

// ============================================================================
// Memory lifecycle
// ============================================================================

#[test]
fn test_transferred_memories_strictly_less_reliable() {
    let mut court = full_court();
    let config = EngineConfig::default();
    let veteran = AdvisorId(1);

    // The veteran accumulates lived experience over several turns
    let ids: Vec<AdvisorId> = court.civ.active_advisors().map(|a| a.id).collect();
    for round in 0..3 {
        court.submit_external(
            EventKind::DiplomacyOutcome {
                favorable: round % 2 == 0,
                description: "an embassy came and went".into(),
            },
            ids.clone(),
        );
        court.run_turn(&config);
    }
    let originals: Vec<f32> = court
        .civ
        .memory
        .memories_of(veteran)
        .iter()
        .map(|m| m.reliability)
        .collect();
    assert!(!originals.is_empty());

    // A successor is appointed and receives the veteran's files
    let turn = court.civ.turn;
    let successor = court.civ.appoint(
        "Aide Tamsin",
        AdvisorRole::Diplomatic,
        Personality::default(),
        turn,
    );
    let moved = court
        .civ
        .memory
        .transfer(
            veteran,
            successor,
            None,
            config.transfer_reliability_discount,
            turn,
        )
        .unwrap();
    assert_eq!(moved, originals.len());

    let min_original = originals.iter().cloned().fold(f32::MAX, f32::min);
    for copy in court.civ.memory.memories_of(successor) {
        assert!(
            copy.reliability < min_original,
            "second-hand copy ({}) must be strictly less reliable than any original ({})",
            copy.reliability,
            min_original
        );
    }
}

#[test]
fn test_recall_reinforcement_saves_memories_from_pruning() {
    let leader = Leader::new("Regent", Personality::default(), LeadershipStyle::Collegial);
    let mut civ = Civilization::new(CivId(1), "Testland", leader);
    let rehearsed = civ.appoint("Rehearsed", AdvisorRole::Military, Personality::default(), 0);
    let forgetful = civ.appoint("Forgetful", AdvisorRole::Economic, Personality::default(), 0);
    let config = EngineConfig::default();

    for advisor in [rehearsed, forgetful] {
        civ.memory
            .store(
                advisor,
                MemoryDraft::new(court_intrigue::core::types::EventId(1), "a minor slight", 0.3, 0.5),
                0,
            )
            .unwrap();
    }

    // Twenty idle turns later, one advisor dwells on the slight
    let _ = civ.memory.recall(rehearsed, None, 0.0, 20);

    let pruned_rehearsed = civ.memory.decay(rehearsed, 20, config.memory_prune_floor);
    let pruned_forgetful = civ.memory.decay(forgetful, 20, config.memory_prune_floor);

    assert_eq!(pruned_rehearsed, 0, "recalled memory must survive the same turn's decay");
    assert_eq!(pruned_forgetful, 1, "unrehearsed memory fades");
}

#[test]
fn test_decay_idempotent_without_turn_advance() {
    let leader = Leader::new("Regent", Personality::default(), LeadershipStyle::Collegial);
    let mut civ = Civilization::new(CivId(1), "Testland", leader);
    let advisor = civ.appoint("A", AdvisorRole::Military, Personality::default(), 0);
    let config = EngineConfig::default();

    for i in 0..5 {
        civ.memory
            .store(
                advisor,
                MemoryDraft::new(
                    court_intrigue::core::types::EventId(i),
                    "routine business",
                    0.3,
                    0.5,
                ),
                0,
            )
            .unwrap();
    }

    let first = civ.memory.decay(advisor, 25, config.memory_prune_floor);
    let second = civ.memory.decay(advisor, 25, config.memory_prune_floor);
    assert!(first > 0);
    assert_eq!(second, 0, "repeated decay in the same turn must be a no-op");
}

// ============================================================================
// Turn results and the game-layer contract
// ============================================================================

#[test]
fn test_turn_result_contract() {
    let mut court = full_court();
    let config = EngineConfig::default();

    let result = court.run_turn(&config);

    assert_eq!(result.civ, CivId(1));
    assert_eq!(result.turn, 1);
    assert!((0.0..=1.0).contains(&result.stability));
    assert_eq!(result.roster.len(), 4);
    for row in &result.roster {
        assert!((0.0..=1.0).contains(&row.loyalty));
        assert!((0.0..=1.0).contains(&row.influence));
    }
    // A council decision is always on the record
    assert!(result.diagnostics.events_processed >= 1);
}

#[test]
fn test_stability_sinks_under_sustained_crisis() {
    let mut court = full_court();
    let config = EngineConfig::default();

    let calm = court.run_turn(&config).stability;

    let ids: Vec<AdvisorId> = court.civ.active_advisors().map(|a| a.id).collect();
    let mut stability = calm;
    for _ in 0..6 {
        court.submit_external(
            EventKind::Crisis {
                description: "famine deepens".into(),
                severity: 0.9,
            },
            ids.clone(),
        );
        stability = court.run_turn(&config).stability;
    }

    assert!(stability < calm, "sustained crisis must erode stability");
}

#[test]
fn test_dropped_events_are_reported_not_fatal() {
    let mut court = full_court();
    let config = EngineConfig::default();

    court.submit_external(
        EventKind::Crisis {
            description: "report from a ghost".into(),
            severity: 0.5,
        },
        vec![AdvisorId(999)],
    );
    let result = court.run_turn(&config);

    assert!(!result.aborted);
    assert_eq!(result.diagnostics.events_dropped, 1);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_round_trip_mid_game() {
    let mut court = full_court();
    let config = EngineConfig::default();
    let ids: Vec<AdvisorId> = court.civ.active_advisors().map(|a| a.id).collect();

    for round in 0..5 {
        if round == 2 {
            court.submit_external(
                EventKind::CombatOutcome {
                    victory: false,
                    description: "a column was ambushed".into(),
                },
                ids.clone(),
            );
        }
        court.run_turn(&config);
    }

    let saved = snapshot::capture(&court);
    let json = snapshot::to_json(&saved).unwrap();
    let restored = snapshot::from_json(&json).unwrap();

    assert_eq!(snapshot::capture(&restored), saved);
    assert_eq!(restored.civ.turn, court.civ.turn);
    assert_eq!(restored.history.len(), court.history.len());
}

#[test]
fn test_corrupt_snapshot_is_fatal_and_partial_free() {
    let court = full_court();
    let mut saved = snapshot::capture(&court);
    saved.civ.advisors[0].influence = -4.0;

    let json = snapshot::to_json(&saved).unwrap();
    assert!(snapshot::from_json(&json).is_err());
}
