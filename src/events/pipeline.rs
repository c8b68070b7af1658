//! Consequence pipeline: applies each event atomically
//!
//! Per event: validate every referenced advisor, derive the full
//! consequence set, then apply it — all of it or none. Events referencing
//! unknown or terminal advisors are dropped with a logged warning; the
//! turn continues. Processing order within a turn is priority class first
//! (coup > crisis > conspiracy > decision > appointment), then lowest
//! event id.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::civilization::Civilization;
use crate::core::config::EngineConfig;
use crate::core::types::{ActorRef, AdvisorId, AdvisorStatus, EventId, Turn};
use crate::events::{event_priority, EventKind, HistoryLog, PoliticalEvent};
use crate::memory::{MemoryDraft, MemoryTag};
use crate::personality::{drift, DriftPressure};
use crate::relations::interaction_delta;

/// One atomic mutation derived from an event
#[derive(Debug, Clone, PartialEq)]
pub enum Consequence {
    WriteMemory {
        advisor: AdvisorId,
        draft: MemoryDraft,
    },
    AdjustRelation {
        from: ActorRef,
        to: ActorRef,
        trust_delta: f32,
        influence_delta: f32,
    },
    AdjustLoyalty {
        advisor: AdvisorId,
        delta: f32,
    },
    AdjustInfluence {
        advisor: AdvisorId,
        delta: f32,
    },
    AdjustLeaderTrust {
        advisor: AdvisorId,
        delta: f32,
    },
    DriftPersonality {
        advisor: AdvisorId,
        pressure: DriftPressure,
    },
    SetStatus {
        advisor: AdvisorId,
        status: AdvisorStatus,
    },
    CrownAdvisor {
        advisor: AdvisorId,
    },
    RaiseSecurity {
        until_turn: Turn,
    },
    /// Enqueue a cascading follow-on event
    FollowOn {
        kind: EventKind,
        participants: Vec<AdvisorId>,
    },
}

/// Counters for one drain pass, surfaced on the turn result
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineReport {
    pub processed: usize,
    pub dropped: usize,
    pub clamped: usize,
    pub faults: usize,
    pub aborted: bool,
}

impl PipelineReport {
    pub fn merge(&mut self, other: PipelineReport) {
        self.processed += other.processed;
        self.dropped += other.dropped;
        self.clamped += other.clamped;
        self.faults += other.faults;
        self.aborted |= other.aborted;
    }
}

/// Queue of triggered-but-unapplied events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPipeline {
    queue: Vec<PoliticalEvent>,
    next_id: u64,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly triggered event; its consequences apply on the next
    /// drain
    pub fn trigger(&mut self, kind: EventKind, participants: Vec<AdvisorId>, turn: Turn) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.queue.push(PoliticalEvent {
            id,
            kind,
            participants,
            turn,
        });
        id
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Apply all queued events in priority order
    ///
    /// An abort flag checked between events lets the game loop cancel a
    /// turn without leaving a partially-applied event behind.
    pub fn drain(
        &mut self,
        civ: &mut Civilization,
        history: &mut HistoryLog,
        config: &EngineConfig,
        abort: Option<&AtomicBool>,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();

        while !self.queue.is_empty() {
            if report.processed + report.dropped >= config.max_events_per_turn {
                tracing::warn!(
                    remaining = self.queue.len(),
                    "event cascade exceeded the per-turn cap; dropping remainder"
                );
                report.dropped += self.queue.len();
                self.queue.clear();
                break;
            }

            if abort.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                report.aborted = true;
                break;
            }

            let idx = self
                .queue
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| (event_priority(&e.kind), e.id))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let event = self.queue.remove(idx);

            if let Some(bad) = event.participants.iter().find(|id| !civ.is_active(**id)) {
                tracing::warn!(
                    event = ?event.id,
                    advisor = ?bad,
                    "event references unknown or terminal advisor; dropped"
                );
                report.dropped += 1;
                continue;
            }

            let consequences = derive_consequences(civ, config, &event);
            for consequence in consequences {
                self.apply(civ, config, consequence, event.turn, &mut report);
            }

            history.record(event);
            report.processed += 1;
        }

        report
    }

    fn apply(
        &mut self,
        civ: &mut Civilization,
        config: &EngineConfig,
        consequence: Consequence,
        turn: Turn,
        report: &mut PipelineReport,
    ) {
        match consequence {
            Consequence::WriteMemory { advisor, draft } => {
                if let Err(e) = civ.memory.store(advisor, draft, turn) {
                    tracing::warn!(?advisor, error = %e, "memory write dropped");
                    report.faults += 1;
                }
            }
            Consequence::AdjustRelation {
                from,
                to,
                trust_delta,
                influence_delta,
            } => {
                if civ.relations.apply_delta(from, to, trust_delta, influence_delta, turn) {
                    report.clamped += 1;
                }
            }
            Consequence::AdjustLoyalty { advisor, delta } => match civ.adjust_loyalty(advisor, delta) {
                Ok(clamped) => report.clamped += clamped as usize,
                Err(e) => {
                    tracing::warn!(?advisor, error = %e, "loyalty adjustment dropped");
                    report.faults += 1;
                }
            },
            Consequence::AdjustInfluence { advisor, delta } => {
                match civ.adjust_influence(advisor, delta) {
                    Ok(clamped) => report.clamped += clamped as usize,
                    Err(e) => {
                        tracing::warn!(?advisor, error = %e, "influence adjustment dropped");
                        report.faults += 1;
                    }
                }
            }
            Consequence::AdjustLeaderTrust { advisor, delta } => {
                report.clamped += civ.adjust_leader_trust(advisor, delta) as usize;
            }
            Consequence::DriftPersonality { advisor, pressure } => {
                if let Some(a) = civ.advisor_mut(advisor) {
                    a.personality = drift(&a.personality, &pressure, config.drift_cap_per_turn);
                } else {
                    report.faults += 1;
                }
            }
            Consequence::SetStatus { advisor, status } => {
                if let Err(e) = civ.set_status(advisor, status) {
                    tracing::warn!(?advisor, error = %e, "status transition dropped");
                    report.faults += 1;
                }
            }
            Consequence::CrownAdvisor { advisor } => {
                if let Err(e) = civ.promote_leader(advisor, turn) {
                    tracing::warn!(?advisor, error = %e, "succession failed");
                    report.faults += 1;
                }
            }
            Consequence::RaiseSecurity { until_turn } => {
                civ.security_until = Some(civ.security_until.map_or(until_turn, |u| u.max(until_turn)));
            }
            Consequence::FollowOn { kind, participants } => {
                self.trigger(kind, participants, turn);
            }
        }
    }
}

/// Derive the full consequence set for an event
///
/// Pure with respect to `civ`: reads state, produces mutations, applies
/// nothing. Every participant gets their own memory with
/// participant-specific emotional impact and reliability, since the same
/// event is experienced differently by each witness.
fn derive_consequences(
    civ: &Civilization,
    config: &EngineConfig,
    event: &PoliticalEvent,
) -> Vec<Consequence> {
    let mut out = Vec::new();
    let gain = config.interaction_trust_gain;

    match &event.kind {
        EventKind::LeaderDecision {
            option,
            followed,
            overridden,
            negative_majority,
        } => {
            for id in followed {
                out.push(memory(
                    *id,
                    event.id,
                    format!("the leader took my counsel on {}", option.label()),
                    0.3,
                    0.9,
                    &[MemoryTag::LeaderDecision],
                    config,
                ));
                out.push(Consequence::AdjustRelation {
                    from: ActorRef::Advisor(*id),
                    to: ActorRef::Leader,
                    trust_delta: 0.05,
                    influence_delta: 0.02,
                });
            }
            for id in overridden {
                out.push(memory(
                    *id,
                    event.id,
                    format!("the leader dismissed my counsel for {}", option.label()),
                    -0.4,
                    0.9,
                    &[MemoryTag::LeaderDecision],
                    config,
                ));
                out.push(Consequence::AdjustRelation {
                    from: ActorRef::Advisor(*id),
                    to: ActorRef::Leader,
                    trust_delta: -0.08,
                    influence_delta: 0.0,
                });
                out.push(Consequence::AdjustLeaderTrust {
                    advisor: *id,
                    delta: -0.03,
                });
                if *negative_majority {
                    out.push(Consequence::AdjustLoyalty {
                        advisor: *id,
                        delta: -config.override_loyalty_penalty,
                    });
                    // Sustained overriding breeds ambition and erodes the
                    // habit of loyalty
                    out.push(Consequence::DriftPersonality {
                        advisor: *id,
                        pressure: DriftPressure {
                            ambition: 0.01,
                            loyalty_baseline: -0.01,
                            ..Default::default()
                        },
                    });
                }
            }
            let valence = if *negative_majority { -0.2 } else { 0.2 };
            pairwise_trust(civ, &event.participants, valence, gain, &mut out);
        }

        EventKind::SupportRequested { by, granted } => {
            if *granted {
                out.push(memory(
                    *by,
                    event.id,
                    "my request for support was granted",
                    0.4,
                    1.0,
                    &[],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *by,
                    delta: 0.05,
                });
            } else {
                out.push(memory(
                    *by,
                    event.id,
                    "my request for support was refused",
                    -0.5,
                    1.0,
                    &[],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *by,
                    delta: -0.1,
                });
                // Cascading consequence: a refusal seeds later disloyalty
                out.push(Consequence::FollowOn {
                    kind: EventKind::ResentmentFestered { advisor: *by },
                    participants: vec![*by],
                });
            }
        }

        EventKind::ResentmentFestered { advisor } => {
            out.push(memory(
                *advisor,
                event.id,
                "this court gives me nothing; I owe it nothing",
                -0.3,
                0.9,
                &[MemoryTag::Conspiracy],
                config,
            ));
            out.push(Consequence::AdjustLoyalty {
                advisor: *advisor,
                delta: -0.05,
            });
            out.push(Consequence::DriftPersonality {
                advisor: *advisor,
                pressure: DriftPressure {
                    corruption: 0.01,
                    ..Default::default()
                },
            });
        }

        EventKind::Crisis {
            description,
            severity,
        } => {
            let severity = severity.clamp(0.0, 1.0);
            for id in &event.participants {
                out.push(memory(
                    *id,
                    event.id,
                    format!("crisis: {}", description),
                    -severity,
                    0.8,
                    &[MemoryTag::Crisis],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *id,
                    delta: -0.05 * severity,
                });
            }
            pairwise_trust(civ, &event.participants, -severity, gain, &mut out);
        }

        EventKind::DiplomacyOutcome {
            favorable,
            description,
        } => {
            let impact = if *favorable { 0.4 } else { -0.4 };
            for id in &event.participants {
                out.push(memory(
                    *id,
                    event.id,
                    description.clone(),
                    impact,
                    0.8,
                    &[MemoryTag::Diplomacy],
                    config,
                ));
            }
            pairwise_trust(civ, &event.participants, impact, gain, &mut out);
        }

        EventKind::CombatOutcome {
            victory,
            description,
        } => {
            let impact = if *victory { 0.5 } else { -0.6 };
            let loyalty_delta = if *victory { 0.03 } else { -0.05 };
            for id in &event.participants {
                out.push(memory(
                    *id,
                    event.id,
                    description.clone(),
                    impact,
                    0.8,
                    &[MemoryTag::Crisis],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *id,
                    delta: loyalty_delta,
                });
            }
            pairwise_trust(civ, &event.participants, impact, gain, &mut out);
        }

        EventKind::ResearchCompleted { description } => {
            for id in &event.participants {
                out.push(memory(
                    *id,
                    event.id,
                    description.clone(),
                    0.2,
                    0.9,
                    &[],
                    config,
                ));
            }
        }

        EventKind::AdvisorAppointed { advisor, role: _ } => {
            out.push(memory(
                *advisor,
                event.id,
                "I was raised to the council",
                0.5,
                1.0,
                &[MemoryTag::Appointment],
                config,
            ));
            for other in civ.active_advisors().filter(|a| a.id != *advisor) {
                out.push(memory(
                    other.id,
                    event.id,
                    "a newcomer was raised to the council",
                    0.1,
                    0.6,
                    &[MemoryTag::Appointment],
                    config,
                ));
            }
        }

        EventKind::AdvisorDismissed { advisor } => {
            witness_departure(civ, config, event.id, *advisor, -0.3, -0.1, &mut out);
            out.push(Consequence::SetStatus {
                advisor: *advisor,
                status: AdvisorStatus::Dismissed,
            });
        }

        EventKind::AdvisorExecuted { advisor } => {
            witness_departure(civ, config, event.id, *advisor, -0.8, -0.2, &mut out);
            // Watching the axe fall hardens survivors
            for other in civ.active_advisors().filter(|a| a.id != *advisor) {
                out.push(Consequence::DriftPersonality {
                    advisor: other.id,
                    pressure: DriftPressure {
                        corruption: 0.01,
                        loyalty_baseline: -0.01,
                        ..Default::default()
                    },
                });
            }
            out.push(Consequence::SetStatus {
                advisor: *advisor,
                status: AdvisorStatus::Executed,
            });
        }

        EventKind::AdvisorRetired { advisor } => {
            witness_departure(civ, config, event.id, *advisor, 0.1, 0.0, &mut out);
            out.push(Consequence::SetStatus {
                advisor: *advisor,
                status: AdvisorStatus::Retired,
            });
        }

        EventKind::ConspiracyFormed { conspiracy: _ } => {
            for id in &event.participants {
                out.push(memory(
                    *id,
                    event.id,
                    "we swore to act when the moment comes",
                    0.4,
                    1.0,
                    &[MemoryTag::Conspiracy],
                    config,
                ));
            }
            // Shared danger binds the cell together
            pairwise_trust(civ, &event.participants, 0.5, gain, &mut out);
        }

        EventKind::ConspiracyGrew {
            conspiracy: _,
            recruit,
        } => {
            out.push(memory(
                *recruit,
                event.id,
                "I was brought into the plot",
                0.3,
                1.0,
                &[MemoryTag::Conspiracy],
                config,
            ));
            pairwise_trust(civ, &event.participants, 0.3, gain, &mut out);
        }

        EventKind::ConspiracyDissolved { conspiracy: _ } => {
            for id in &event.participants {
                out.push(memory(
                    *id,
                    event.id,
                    "we stepped back from the brink",
                    0.2,
                    0.9,
                    &[MemoryTag::Conspiracy],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *id,
                    delta: 0.05,
                });
            }
        }

        EventKind::ConspiracyDiscovered {
            conspiracy: _,
            members,
        } => {
            for id in members {
                out.push(memory(
                    *id,
                    event.id,
                    "the plot was laid bare before the throne",
                    -0.7,
                    1.0,
                    &[MemoryTag::Conspiracy],
                    config,
                ));
                out.push(Consequence::AdjustLeaderTrust {
                    advisor: *id,
                    delta: -0.6,
                });
            }
            // Discovery triggers the punitive sweep
            out.push(Consequence::FollowOn {
                kind: EventKind::Purge {
                    targets: members.clone(),
                },
                participants: members.clone(),
            });
        }

        EventKind::Purge { targets } => {
            for id in targets {
                out.push(memory(
                    *id,
                    event.id,
                    "the purge came for me",
                    -0.7,
                    0.9,
                    &[MemoryTag::Coup],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *id,
                    delta: -config.purge_loyalty_penalty,
                });
                out.push(Consequence::AdjustInfluence {
                    advisor: *id,
                    delta: -config.purge_influence_penalty,
                });
            }
            for witness in civ.active_advisors().filter(|a| !targets.contains(&a.id)) {
                out.push(memory(
                    witness.id,
                    event.id,
                    "colleagues were dragged from the council hall",
                    -0.4,
                    0.7,
                    &[MemoryTag::Coup],
                    config,
                ));
                out.push(Consequence::DriftPersonality {
                    advisor: witness.id,
                    pressure: DriftPressure {
                        corruption: 0.01,
                        pragmatism: 0.01,
                        ..Default::default()
                    },
                });
            }
        }

        EventKind::SecurityMeasures { until_turn } => {
            out.push(Consequence::RaiseSecurity {
                until_turn: *until_turn,
            });
            for advisor in civ.active_advisors() {
                out.push(memory(
                    advisor.id,
                    event.id,
                    "guards now stand at every door",
                    -0.25,
                    1.0,
                    &[MemoryTag::Security],
                    config,
                ));
            }
        }

        EventKind::CoupSucceeded {
            conspiracy: _,
            new_leader,
            members,
        } => {
            out.push(Consequence::CrownAdvisor {
                advisor: *new_leader,
            });
            for id in members.iter().filter(|m| *m != new_leader) {
                out.push(memory(
                    *id,
                    event.id,
                    "we took the palace; a new reign begins",
                    0.8,
                    1.0,
                    &[MemoryTag::Coup],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *id,
                    delta: 0.3,
                });
                out.push(Consequence::AdjustInfluence {
                    advisor: *id,
                    delta: 0.1,
                });
            }
            // Old-guard loyalists face the purge in a secondary event
            let old_guard: Vec<AdvisorId> = civ
                .active_advisors()
                .filter(|a| {
                    !members.contains(&a.id)
                        && a.id != *new_leader
                        && a.loyalty >= config.loyalty_recovery_threshold
                })
                .map(|a| a.id)
                .collect();
            for id in civ
                .active_advisors()
                .filter(|a| !members.contains(&a.id) && a.id != *new_leader)
                .map(|a| a.id)
            {
                out.push(memory(
                    id,
                    event.id,
                    "the throne changed hands overnight",
                    -0.6,
                    0.9,
                    &[MemoryTag::Coup],
                    config,
                ));
            }
            if !old_guard.is_empty() {
                out.push(Consequence::FollowOn {
                    kind: EventKind::Purge {
                        targets: old_guard.clone(),
                    },
                    participants: old_guard,
                });
            }
        }

        EventKind::CoupFailed {
            conspiracy: _,
            members,
            detected,
        } => {
            for id in members {
                let content = if *detected {
                    "the leader knew before we moved"
                } else {
                    "our strike failed at the threshold"
                };
                out.push(memory(
                    *id,
                    event.id,
                    content,
                    -0.9,
                    1.0,
                    &[MemoryTag::Coup],
                    config,
                ));
                out.push(Consequence::AdjustLoyalty {
                    advisor: *id,
                    delta: -config.failed_coup_loyalty_penalty,
                });
                out.push(Consequence::AdjustInfluence {
                    advisor: *id,
                    delta: -config.failed_coup_influence_penalty,
                });
                out.push(Consequence::AdjustLeaderTrust {
                    advisor: *id,
                    delta: -0.8,
                });
            }
            for witness in civ.active_advisors().filter(|a| !members.contains(&a.id)) {
                out.push(memory(
                    witness.id,
                    event.id,
                    "a coup was attempted and put down",
                    -0.3,
                    0.8,
                    &[MemoryTag::Coup],
                    config,
                ));
            }
            out.push(Consequence::FollowOn {
                kind: EventKind::SecurityMeasures {
                    until_turn: event.turn + config.security_cooldown_turns,
                },
                participants: Vec::new(),
            });
        }
    }

    out
}

fn memory(
    advisor: AdvisorId,
    event: EventId,
    content: impl Into<String>,
    impact: f32,
    reliability: f32,
    tags: &[MemoryTag],
    config: &EngineConfig,
) -> Consequence {
    Consequence::WriteMemory {
        advisor,
        draft: MemoryDraft::new(event, content, impact, reliability)
            .with_decay(config.memory_decay_rate)
            .with_tags(tags),
    }
}

/// Trust deltas for every ordered pair of co-participants
fn pairwise_trust(
    civ: &Civilization,
    participants: &[AdvisorId],
    valence: f32,
    gain: f32,
    out: &mut Vec<Consequence>,
) {
    for (i, a) in participants.iter().enumerate() {
        for b in participants.iter().skip(i + 1) {
            let (Some(pa), Some(pb)) = (civ.advisor(*a), civ.advisor(*b)) else {
                continue;
            };
            let delta = interaction_delta(&pa.personality, &pb.personality, valence, gain);
            out.push(Consequence::AdjustRelation {
                from: ActorRef::Advisor(*a),
                to: ActorRef::Advisor(*b),
                trust_delta: delta,
                influence_delta: 0.0,
            });
            out.push(Consequence::AdjustRelation {
                from: ActorRef::Advisor(*b),
                to: ActorRef::Advisor(*a),
                trust_delta: delta,
                influence_delta: 0.0,
            });
        }
    }
}

/// Memories and trust shifts for the rest of the court when one advisor
/// leaves it
fn witness_departure(
    civ: &Civilization,
    config: &EngineConfig,
    event: EventId,
    departing: AdvisorId,
    impact: f32,
    leader_trust_shift: f32,
    out: &mut Vec<Consequence>,
) {
    let name = civ
        .advisor(departing)
        .map_or_else(|| "an advisor".to_string(), |a| a.name.clone());
    for other in civ.active_advisors().filter(|a| a.id != departing) {
        out.push(memory(
            other.id,
            event,
            format!("{} left the council", name),
            impact,
            0.8,
            &[MemoryTag::Appointment],
            config,
        ));
        if leader_trust_shift != 0.0 {
            out.push(Consequence::AdjustRelation {
                from: ActorRef::Advisor(other.id),
                to: ActorRef::Leader,
                trust_delta: leader_trust_shift,
                influence_delta: 0.0,
            });
        }
    }
}
