//! Turn orchestration
//!
//! One civilization's turn is a single logical unit of work: relationship
//! decay, external triggers, event processing, advice and decision, memory
//! decay, conspiracy evaluation, then a `TurnResult` for the game layer.
//! Civilizations are mutually independent, so `Engine::advance_all` walks
//! them on worker threads without fine-grained locking. Cross-civilization
//! triggers are queued and injected only at turn boundaries.

use std::sync::atomic::AtomicBool;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::civilization::Civilization;
use crate::conspiracy::{self, ConspiracyLedger};
use crate::core::config::EngineConfig;
use crate::core::error::{PoliticsError, Result};
use crate::core::types::{AdvisorId, AdvisorRole, AdvisorStatus, CivId, Turn};
use crate::decision::{self, Advice, DecisionContext};
use crate::events::{EventClass, EventKind, EventPipeline, HistoryLog, PipelineReport};
use crate::llm::GenerativeCapability;

/// Player-visible summary of one notable occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotableEvent {
    pub turn: Turn,
    pub headline: String,
}

/// Roster snapshot row handed to the game layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorSummary {
    pub id: AdvisorId,
    pub name: String,
    pub role: AdvisorRole,
    pub loyalty: f32,
    pub influence: f32,
    pub status: AdvisorStatus,
}

/// Absorbed-fault counters for one turn
///
/// Internal faults never surface to players; they surface here for
/// diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnDiagnostics {
    pub events_processed: usize,
    pub events_dropped: usize,
    pub deltas_clamped: usize,
    pub faults_absorbed: usize,
    pub memories_pruned: usize,
    pub backend_fallbacks: usize,
}

/// What the surrounding game loop receives after a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub civ: CivId,
    pub turn: Turn,
    pub stability: f32,
    pub notable_events: Vec<NotableEvent>,
    pub roster: Vec<AdvisorSummary>,
    pub diagnostics: TurnDiagnostics,
    pub aborted: bool,
}

/// One civilization's complete political state plus its hidden stores
///
/// The conspiracy ledger is deliberately private: the decision engine
/// receives only `&Civilization`, so the leader's advice channel cannot
/// observe plots by construction.
pub struct Court {
    pub civ: Civilization,
    pub(crate) ledger: ConspiracyLedger,
    pub(crate) pipeline: EventPipeline,
    pub history: HistoryLog,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) seed: u64,
    external_queue: Vec<(EventKind, Vec<AdvisorId>)>,
    agenda: Option<DecisionContext>,
}

impl Court {
    pub fn new(civ: Civilization, seed: u64) -> Self {
        let stream = seed.wrapping_add(u64::from(civ.id.0));
        Self {
            civ,
            ledger: ConspiracyLedger::new(),
            pipeline: EventPipeline::new(),
            history: HistoryLog::new(),
            rng: ChaCha8Rng::seed_from_u64(stream),
            seed: stream,
            external_queue: Vec::new(),
            agenda: None,
        }
    }

    pub(crate) fn from_parts(
        civ: Civilization,
        ledger: ConspiracyLedger,
        pipeline: EventPipeline,
        history: HistoryLog,
        seed: u64,
    ) -> Self {
        Self {
            civ,
            ledger,
            pipeline,
            history,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            external_queue: Vec::new(),
            agenda: None,
        }
    }

    /// Queue an external trigger (diplomacy result, combat outcome, ...)
    ///
    /// Applied at the next turn boundary, never mid-turn.
    pub fn submit_external(&mut self, kind: EventKind, participants: Vec<AdvisorId>) {
        self.external_queue.push((kind, participants));
    }

    /// Set the matter before the council for the next turn
    pub fn set_agenda(&mut self, ctx: DecisionContext) {
        self.agenda = Some(ctx);
    }

    /// Run one turn with the rule-based decision path
    pub fn run_turn(&mut self, config: &EngineConfig) -> TurnResult {
        self.run_turn_with_abort(config, None)
    }

    /// Run one turn, honoring a cooperative abort flag between events
    pub fn run_turn_with_abort(
        &mut self,
        config: &EngineConfig,
        abort: Option<&AtomicBool>,
    ) -> TurnResult {
        let (turn, ctx, report) = self.open_turn(config, abort);
        if report.aborted {
            return self.close_aborted(turn, report, 0);
        }

        let mut advice = Vec::new();
        let mut ids: Vec<AdvisorId> = self.civ.active_advisors().map(|a| a.id).collect();
        ids.sort_unstable();
        for id in ids {
            match decision::advise(&mut self.civ, id, &ctx, config) {
                Ok(a) => advice.push(a),
                Err(e) => tracing::warn!(advisor = ?id, error = %e, "advice skipped"),
            }
        }

        self.close_turn(config, abort, turn, ctx, report, advice, 0)
    }

    /// Run one turn, gathering advice through the generative capability
    ///
    /// Backend faults never surface here: every query answers, by backend
    /// or by rule-based fallback.
    pub async fn run_turn_with_backend<B: GenerativeCapability>(
        &mut self,
        config: &EngineConfig,
        backend: &B,
    ) -> TurnResult {
        let (turn, ctx, report) = self.open_turn(config, None);
        if report.aborted {
            return self.close_aborted(turn, report, 0);
        }

        let (advice, fallbacks) =
            decision::gather_advice(&mut self.civ, &ctx, config, backend).await;
        self.close_turn(config, None, turn, ctx, report, advice, fallbacks)
    }

    /// Decay, external injection, and the first drain
    fn open_turn(
        &mut self,
        config: &EngineConfig,
        abort: Option<&AtomicBool>,
    ) -> (Turn, DecisionContext, PipelineReport) {
        let turn = self.civ.turn + 1;
        self.civ.turn = turn;

        // Drift first so event-driven deltas dominate
        self.civ
            .relations
            .decay_all(config.relation_decay_fraction, turn);

        for (kind, participants) in self.external_queue.drain(..) {
            self.pipeline.trigger(kind, participants, turn);
        }
        let report = self
            .pipeline
            .drain(&mut self.civ, &mut self.history, config, abort);

        let ctx = match self.agenda.take() {
            Some(mut agenda) => {
                agenda.turn = turn;
                agenda
            }
            None => DecisionContext::council_session(turn),
        };

        (turn, ctx, report)
    }

    /// Decision event, memory decay, conspiracy evaluation, result assembly
    #[allow(clippy::too_many_arguments)]
    fn close_turn(
        &mut self,
        config: &EngineConfig,
        abort: Option<&AtomicBool>,
        turn: Turn,
        ctx: DecisionContext,
        mut report: PipelineReport,
        advice: Vec<Advice>,
        backend_fallbacks: usize,
    ) -> TurnResult {
        let decision = decision::decide(&self.civ, &advice, &ctx);
        let (kind, participants) = decision::decision_event(&advice, &decision);
        self.pipeline.trigger(kind, participants, turn);
        report.merge(
            self.pipeline
                .drain(&mut self.civ, &mut self.history, config, abort),
        );
        if report.aborted {
            return self.close_aborted(turn, report, backend_fallbacks);
        }

        let pruned = self.civ.memory.decay_all(turn, config.memory_prune_floor);

        conspiracy::evaluate(
            &self.civ,
            &mut self.ledger,
            &mut self.pipeline,
            config,
            turn,
            &mut self.rng,
        );
        report.merge(
            self.pipeline
                .drain(&mut self.civ, &mut self.history, config, abort),
        );

        let crisis_pressure = (self
            .history
            .events_for_turn(turn)
            .filter(|e| matches!(e.kind.class(), EventClass::Crisis | EventClass::Coup))
            .count() as f32
            * 0.25)
            .min(1.0);
        self.civ
            .recompute_stability(self.ledger.pressure(), crisis_pressure);

        self.assemble(turn, report, pruned, backend_fallbacks)
    }

    fn close_aborted(
        &mut self,
        turn: Turn,
        report: PipelineReport,
        backend_fallbacks: usize,
    ) -> TurnResult {
        tracing::info!(civ = ?self.civ.id, turn, "turn aborted by game loop");
        self.assemble(turn, report, 0, backend_fallbacks)
    }

    fn assemble(
        &self,
        turn: Turn,
        report: PipelineReport,
        pruned: usize,
        backend_fallbacks: usize,
    ) -> TurnResult {
        let notable_events = self
            .history
            .events_for_turn(turn)
            .filter_map(|e| {
                e.kind.headline().map(|headline| NotableEvent {
                    turn,
                    headline,
                })
            })
            .collect();

        let roster = self
            .civ
            .advisors
            .iter()
            .map(|a| AdvisorSummary {
                id: a.id,
                name: a.name.clone(),
                role: a.role,
                loyalty: a.loyalty,
                influence: a.influence,
                status: a.status,
            })
            .collect();

        TurnResult {
            civ: self.civ.id,
            turn,
            stability: self.civ.stability,
            notable_events,
            roster,
            diagnostics: TurnDiagnostics {
                events_processed: report.processed,
                events_dropped: report.dropped,
                deltas_clamped: report.clamped,
                faults_absorbed: report.faults,
                memories_pruned: pruned,
                backend_fallbacks,
            },
            aborted: report.aborted,
        }
    }
}

/// All courts plus the shared configuration
pub struct Engine {
    pub courts: Vec<Court>,
    pub config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(PoliticsError::InvariantViolation)?;
        Ok(Self {
            courts: Vec::new(),
            config,
        })
    }

    pub fn add_court(&mut self, civ: Civilization) -> CivId {
        let id = civ.id;
        let seed = self.config.seed;
        self.courts.push(Court::new(civ, seed));
        id
    }

    pub fn court(&self, id: CivId) -> Option<&Court> {
        self.courts.iter().find(|c| c.civ.id == id)
    }

    pub fn court_mut(&mut self, id: CivId) -> Option<&mut Court> {
        self.courts.iter_mut().find(|c| c.civ.id == id)
    }

    /// Advance every civilization one turn, in parallel
    ///
    /// Safe without locking: no shared mutable state crosses civilization
    /// boundaries except queued external events, which only land at turn
    /// boundaries.
    pub fn advance_all(&mut self) -> Vec<TurnResult> {
        let config = &self.config;
        self.courts
            .par_iter_mut()
            .map(|court| court.run_turn(config))
            .collect()
    }
}
