//! Court politics simulation binary
//!
//! Seeds a small court per civilization, runs a number of turns, prints
//! the notable political history, and writes a full snapshot to JSON.

use clap::Parser;

use court_intrigue::civilization::{Civilization, Leader};
use court_intrigue::core::config::EngineConfig;
use court_intrigue::core::types::{AdvisorId, AdvisorRole, CivId, LeadershipStyle};
use court_intrigue::events::EventKind;
use court_intrigue::personality::{load_archetype, Personality};
use court_intrigue::snapshot;
use court_intrigue::turn::Engine;

#[derive(Parser, Debug)]
#[command(name = "intrigue_sim", about = "Run the political simulation engine")]
struct Args {
    /// Number of turns to simulate
    #[arg(long, default_value_t = 40)]
    turns: u32,

    /// Number of civilizations
    #[arg(long, default_value_t = 2)]
    civs: u32,

    /// Master random seed
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Output file for the final snapshot of the first civilization
    #[arg(long, default_value = "intrigue_output.json")]
    out: String,
}

fn archetype(name: &str) -> Personality {
    load_archetype(name).unwrap_or_default()
}

fn build_civ(id: u32) -> Civilization {
    let leader = Leader::new(
        format!("Sovereign {}", id),
        archetype("default"),
        LeadershipStyle::Collegial,
    );
    let mut civ = Civilization::new(CivId(id), format!("Realm {}", id), leader);

    civ.appoint("General Ash", AdvisorRole::Military, archetype("schemer"), 0);
    civ.appoint("Treasurer Brel", AdvisorRole::Economic, archetype("pragmatist"), 0);
    civ.appoint("Envoy Seren", AdvisorRole::Diplomatic, archetype("default"), 0);
    civ.appoint("High Priest Oral", AdvisorRole::Religious, archetype("zealot"), 0);
    civ.appoint("Warden Cora", AdvisorRole::Security, archetype("loyalist"), 0);
    civ
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "court_intrigue=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        seed: args.seed,
        ..Default::default()
    };

    println!("Court Intrigue - Political Simulation");
    println!("=====================================");
    println!("Civilizations: {}", args.civs);
    println!("Turns: {}", args.turns);
    println!("Seed: {}", args.seed);
    println!();

    let mut engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    for id in 1..=args.civs {
        engine.add_court(build_civ(id));
    }

    let start = std::time::Instant::now();
    for turn in 1..=args.turns {
        // Feed the courts some external pressure now and then
        if turn % 7 == 0 {
            for court in &mut engine.courts {
                let roster: Vec<AdvisorId> = court.civ.active_advisors().map(|a| a.id).collect();
                court.submit_external(
                    EventKind::CombatOutcome {
                        victory: turn % 14 != 0,
                        description: "a border skirmish was fought".into(),
                    },
                    roster,
                );
            }
        }

        for result in engine.advance_all() {
            for event in &result.notable_events {
                println!("[turn {:>3}] realm {}: {}", result.turn, result.civ.0, event.headline);
            }
        }
    }
    let elapsed = start.elapsed();

    println!();
    println!("--- Final standing ---");
    for court in &engine.courts {
        println!(
            "{}: leader {}, stability {:.2}, {} advisors active, {} events recorded",
            court.civ.name,
            court.civ.leader.name,
            court.civ.stability,
            court.civ.active_advisors().count(),
            court.history.len(),
        );
    }
    println!("Simulated in {:.2}ms", elapsed.as_secs_f64() * 1000.0);

    if let Some(court) = engine.courts.first() {
        match snapshot::to_json(&snapshot::capture(court)) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&args.out, json) {
                    eprintln!("failed to write {}: {}", args.out, e);
                } else {
                    println!("Snapshot written to {}", args.out);
                }
            }
            Err(e) => eprintln!("failed to serialize snapshot: {}", e),
        }
    }
}
