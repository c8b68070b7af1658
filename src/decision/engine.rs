//! Rule-based scoring and the validated generative path
//!
//! Candidate actions are scored as a weighted sum of role weights,
//! personality traits, current standing and recalled memories. The
//! highest score wins with deterministic tie-breaks, so identical inputs
//! always produce identical advice. The generative path substitutes for
//! scoring only when its response validates within the timeout bound;
//! otherwise this module's rule-based core answers.

use std::time::Duration;

use tokio::time::error::Elapsed;

use crate::civilization::{Advisor, Civilization};
use crate::core::config::EngineConfig;
use crate::core::error::{PoliticsError, Result};
use crate::core::types::{ActorRef, AdvisorId, AdvisorRole, LeadershipStyle};
use crate::decision::context::{Advice, Decision, DecisionContext, PolicyOption};
use crate::events::EventKind;
use crate::llm::context::build_advice_request;
use crate::llm::parser::validate_action;
use crate::llm::{AdviceRequest, BackendResponse, GenerativeCapability};
use crate::memory::{Memory, MemoryTag};
use crate::personality::{Ideology, Personality};

/// Fixed per-role weights over the policy options, in `PolicyOption::ALL`
/// order
fn role_weights(role: AdvisorRole) -> [f32; 6] {
    match role {
        AdvisorRole::Military => [0.9, 0.3, 0.4, 0.1, 0.1, 0.5],
        AdvisorRole::Economic => [0.2, 0.4, 0.9, 0.3, 0.1, 0.2],
        AdvisorRole::Diplomatic => [0.1, 0.9, 0.4, 0.3, 0.2, 0.2],
        AdvisorRole::Cultural => [0.1, 0.3, 0.3, 0.9, 0.4, 0.1],
        AdvisorRole::Religious => [0.2, 0.2, 0.2, 0.4, 0.9, 0.3],
        AdvisorRole::Security => [0.4, 0.2, 0.2, 0.1, 0.2, 0.9],
    }
}

fn personality_affinity(p: &Personality, option: PolicyOption) -> f32 {
    let base = match option {
        PolicyOption::MilitaryBuildup => p.ambition * 0.5 + (1.0 - p.pragmatism) * 0.2,
        PolicyOption::Diplomacy => p.pragmatism * 0.5 + (1.0 - p.ambition) * 0.1,
        PolicyOption::EconomicFocus => p.pragmatism * 0.3 + p.corruption * 0.3,
        PolicyOption::CulturalPatronage => (1.0 - p.corruption) * 0.3 + (1.0 - p.ambition) * 0.2,
        PolicyOption::ReligiousAppeal => (1.0 - p.pragmatism) * 0.4 + p.loyalty_baseline * 0.2,
        PolicyOption::InternalSecurity => {
            p.corruption * 0.2 + p.ambition * 0.2 + (1.0 - p.loyalty_baseline) * 0.2
        }
    };

    let ideology = match (p.ideology, option) {
        (Ideology::Expansionist, PolicyOption::MilitaryBuildup) => 0.2,
        (Ideology::Mercantile, PolicyOption::EconomicFocus) => 0.2,
        (Ideology::Theocratic, PolicyOption::ReligiousAppeal) => 0.3,
        (Ideology::Traditionalist, PolicyOption::CulturalPatronage) => 0.15,
        (Ideology::Reformist, PolicyOption::Diplomacy) => 0.15,
        _ => 0.0,
    };

    base + ideology
}

/// What recalled experience says about an option
fn memory_affinity(recalled: &[Memory], option: PolicyOption) -> f32 {
    recalled
        .iter()
        .map(|m| {
            let weight = m.emotional_impact.abs() * m.reliability;
            let bias: f32 = m
                .tags
                .iter()
                .map(|tag| match (tag, option) {
                    (MemoryTag::Coup, PolicyOption::InternalSecurity)
                    | (MemoryTag::Conspiracy, PolicyOption::InternalSecurity)
                    | (MemoryTag::Security, PolicyOption::InternalSecurity) => 0.6,
                    (MemoryTag::Crisis, PolicyOption::MilitaryBuildup) => 0.3,
                    (MemoryTag::Crisis, PolicyOption::InternalSecurity) => 0.2,
                    (MemoryTag::Diplomacy, PolicyOption::Diplomacy) => 0.5,
                    _ => 0.0,
                })
                .sum();
            weight * bias
        })
        .sum()
}

fn score_option(advisor: &Advisor, option: PolicyOption, recalled: &[Memory]) -> f32 {
    let role_w = role_weights(advisor.role)[option.index()];
    role_w * (0.6 + 0.4 * advisor.influence)
        + personality_affinity(&advisor.personality, option)
        + 0.5 * memory_affinity(recalled, option)
}

/// Emotional tone of an advisor's counsel toward the crown
fn valence_of(civ: &Civilization, advisor: &Advisor, recalled: &[Memory]) -> f32 {
    let trust_in_leader = civ
        .relations
        .trust(ActorRef::Advisor(advisor.id), ActorRef::Leader);
    let memory_tone = if recalled.is_empty() {
        0.0
    } else {
        recalled
            .iter()
            .map(|m| m.emotional_impact * m.reliability)
            .sum::<f32>()
            / recalled.len() as f32
    };

    ((advisor.loyalty - 0.5) * 1.2 + trust_in_leader * 0.4 + memory_tone * 0.4).clamp(-1.0, 1.0)
}

/// The rule-based core: advice from an already-recalled memory set
///
/// Options are scored in offer order and only a strictly greater score
/// displaces the leader, so ties resolve to the earliest offered option.
pub fn advise_from_recall(
    civ: &Civilization,
    advisor_id: AdvisorId,
    recalled: &[Memory],
    ctx: &DecisionContext,
) -> Result<Advice> {
    let advisor = civ.advisor(advisor_id).filter(|a| a.is_active()).ok_or_else(|| {
        PoliticsError::DataConsistency(format!("cannot advise: {:?} is not active", advisor_id))
    })?;

    let mut best: Option<(PolicyOption, f32)> = None;
    let mut second = f32::MIN;
    for option in &ctx.options {
        let score = score_option(advisor, *option, recalled);
        match best {
            None => best = Some((*option, score)),
            Some((_, best_score)) if score > best_score => {
                second = best_score;
                best = Some((*option, score));
            }
            Some(_) => second = second.max(score),
        }
    }

    let (option, best_score) = best.ok_or_else(|| {
        PoliticsError::DataConsistency("decision context offered no options".into())
    })?;
    let margin = if second == f32::MIN {
        1.0
    } else {
        best_score - second
    };

    Ok(Advice {
        advisor: advisor_id,
        option,
        conviction: (0.4 + margin).clamp(0.05, 1.0),
        valence: valence_of(civ, advisor, recalled),
        rationale: None,
    })
}

/// Rule-based advice: recall memories (reinforcing them) and score
pub fn advise(
    civ: &mut Civilization,
    advisor_id: AdvisorId,
    ctx: &DecisionContext,
    config: &EngineConfig,
) -> Result<Advice> {
    let prepared = prepare_query(civ, advisor_id, ctx, config)?;
    advise_from_recall(civ, advisor_id, &prepared.recalled, ctx)
}

/// A context package plus the recall that produced it
///
/// Built before any backend call so the mandatory fallback scores the
/// exact same memory set the backend saw.
pub struct PreparedQuery {
    pub advisor: AdvisorId,
    pub request: AdviceRequest,
    pub recalled: Vec<Memory>,
}

pub fn prepare_query(
    civ: &mut Civilization,
    advisor_id: AdvisorId,
    ctx: &DecisionContext,
    config: &EngineConfig,
) -> Result<PreparedQuery> {
    if !civ.is_active(advisor_id) {
        return Err(PoliticsError::DataConsistency(format!(
            "cannot query {:?}: not an active advisor",
            advisor_id
        )));
    }

    let recalled: Vec<Memory> = civ
        .memory
        .recall(advisor_id, None, config.recall_min_salience, ctx.turn)
        .collect();
    let request = build_advice_request(civ, advisor_id, &recalled, ctx).ok_or_else(|| {
        PoliticsError::DataConsistency(format!("advisor {:?} vanished mid-query", advisor_id))
    })?;

    Ok(PreparedQuery {
        advisor: advisor_id,
        request,
        recalled,
    })
}

/// Turn one backend outcome into advice, falling back on any fault
///
/// Returns the advice plus whether the rule-based fallback answered.
fn resolve_outcome(
    civ: &Civilization,
    prepared: &PreparedQuery,
    outcome: std::result::Result<Result<BackendResponse>, Elapsed>,
    ctx: &DecisionContext,
) -> Result<(Advice, bool)> {
    let fall_back = |reason: &str| -> Result<(Advice, bool)> {
        tracing::warn!(
            advisor = ?prepared.advisor,
            request = %prepared.request.request_id,
            reason,
            "generative backend unavailable; rule-based path answering"
        );
        Ok((advise_from_recall(civ, prepared.advisor, &prepared.recalled, ctx)?, true))
    };

    match outcome {
        Ok(Ok(response)) => match validate_action(&response, &ctx.options) {
            Ok(option) => {
                let advisor = civ.advisor(prepared.advisor).ok_or_else(|| {
                    PoliticsError::DataConsistency(format!(
                        "advisor {:?} vanished mid-query",
                        prepared.advisor
                    ))
                })?;
                Ok((
                    Advice {
                        advisor: prepared.advisor,
                        option,
                        conviction: response.confidence,
                        valence: valence_of(civ, advisor, &prepared.recalled),
                        rationale: response.rationale,
                    },
                    false,
                ))
            }
            Err(e) => fall_back(&e.to_string()),
        },
        Ok(Err(e)) => fall_back(&e.to_string()),
        Err(_) => fall_back("timeout"),
    }
}

/// Advice via the generative capability, with the mandatory fallback
pub async fn advise_with_capability<B: GenerativeCapability>(
    civ: &mut Civilization,
    advisor_id: AdvisorId,
    ctx: &DecisionContext,
    config: &EngineConfig,
    backend: &B,
) -> Result<(Advice, bool)> {
    let prepared = prepare_query(civ, advisor_id, ctx, config)?;
    let outcome = tokio::time::timeout(
        Duration::from_millis(config.backend_timeout_ms),
        backend.generate(&prepared.request),
    )
    .await;
    resolve_outcome(civ, &prepared, outcome, ctx)
}

/// Query every active advisor concurrently against the backend
///
/// Requests go out as batched concurrent calls; results are reconciled
/// deterministically by advisor id before any event ordering runs.
/// Returns the advice set plus the number of fallback answers.
pub async fn gather_advice<B: GenerativeCapability>(
    civ: &mut Civilization,
    ctx: &DecisionContext,
    config: &EngineConfig,
    backend: &B,
) -> (Vec<Advice>, usize) {
    let mut ids: Vec<AdvisorId> = civ.active_advisors().map(|a| a.id).collect();
    ids.sort_unstable();

    let mut prepared = Vec::new();
    for id in ids {
        match prepare_query(civ, id, ctx, config) {
            Ok(query) => prepared.push(query),
            Err(e) => tracing::warn!(advisor = ?id, error = %e, "advice query skipped"),
        }
    }

    let timeout = Duration::from_millis(config.backend_timeout_ms);
    let outcomes = futures::future::join_all(
        prepared
            .iter()
            .map(|query| tokio::time::timeout(timeout, backend.generate(&query.request))),
    )
    .await;

    let mut advice_set = Vec::with_capacity(prepared.len());
    let mut fallbacks = 0;
    for (query, outcome) in prepared.iter().zip(outcomes) {
        match resolve_outcome(civ, query, outcome, ctx) {
            Ok((advice, fell_back)) => {
                fallbacks += fell_back as usize;
                advice_set.push(advice);
            }
            Err(e) => tracing::warn!(advisor = ?query.advisor, error = %e, "advice dropped"),
        }
    }
    (advice_set, fallbacks)
}

/// The leader weighs the advice set and commits to a course
///
/// Deterministic: option scores combine the leader's own inclination with
/// trust- and influence-weighted advice; exact ties go to the option
/// backed by the lowest advisor id, then to offer order.
pub fn decide(civ: &Civilization, advice_set: &[Advice], ctx: &DecisionContext) -> Decision {
    let leader = &civ.leader;
    let (self_weight, advice_weight) = match leader.style {
        LeadershipStyle::Authoritarian => (1.2, 0.4),
        LeadershipStyle::Collegial => (0.8, 1.0),
        LeadershipStyle::Paranoid => (1.0, 0.6),
        LeadershipStyle::Charismatic => (1.0, 0.8),
    };

    struct Scored {
        option: PolicyOption,
        score: f32,
        lowest_backer: AdvisorId,
        offer_index: usize,
    }

    let mut scored: Vec<Scored> = ctx
        .options
        .iter()
        .enumerate()
        .map(|(offer_index, option)| {
            let own = personality_affinity(&leader.personality, *option) * self_weight;
            let paranoia = if leader.style == LeadershipStyle::Paranoid
                && *option == PolicyOption::InternalSecurity
            {
                0.3
            } else {
                0.0
            };

            let mut counsel = 0.0;
            let mut lowest_backer = AdvisorId(u32::MAX);
            for advice in advice_set.iter().filter(|a| a.option == *option) {
                let influence = civ.advisor(advice.advisor).map_or(0.0, |a| a.influence);
                let trust = leader.trust_in(advice.advisor);
                counsel +=
                    advice.conviction * (0.5 + 0.5 * trust) * (0.5 + 0.5 * influence) * advice_weight;
                lowest_backer = lowest_backer.min(advice.advisor);
            }

            Scored {
                option: *option,
                score: own + paranoia + counsel,
                lowest_backer,
                offer_index,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.lowest_backer.cmp(&b.lowest_backer))
            .then(a.offer_index.cmp(&b.offer_index))
    });

    let best = scored.first();
    let option = best.map_or(PolicyOption::EconomicFocus, |s| s.option);
    let margin = match (scored.first(), scored.get(1)) {
        (Some(a), Some(b)) => a.score - b.score,
        _ => 1.0,
    };

    Decision {
        option,
        confidence: (0.4 + margin).clamp(0.05, 1.0),
        rationale: None,
    }
}

/// Build the decision event for the pipeline
///
/// Overridden advisors whose counsel carried a negative valence count
/// toward the majority that triggers loyalty penalties.
pub fn decision_event(advice_set: &[Advice], decision: &Decision) -> (EventKind, Vec<AdvisorId>) {
    let followed: Vec<AdvisorId> = advice_set
        .iter()
        .filter(|a| a.option == decision.option)
        .map(|a| a.advisor)
        .collect();
    let overridden: Vec<AdvisorId> = advice_set
        .iter()
        .filter(|a| a.option != decision.option)
        .map(|a| a.advisor)
        .collect();

    let negative_overridden = advice_set
        .iter()
        .filter(|a| a.option != decision.option && a.valence < 0.0)
        .count();
    let negative_majority = negative_overridden * 2 > advice_set.len();

    let participants: Vec<AdvisorId> = advice_set.iter().map(|a| a.advisor).collect();
    (
        EventKind::LeaderDecision {
            option: decision.option,
            followed,
            overridden,
            negative_majority,
        },
        participants,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::Leader;
    use crate::core::types::{CivId, EventId};
    use crate::memory::MemoryDraft;

    fn court() -> Civilization {
        let leader = Leader::new(
            "Regent",
            Personality::new(0.4, 0.6, 0.2, 0.6, Ideology::Traditionalist),
            LeadershipStyle::Collegial,
        );
        let mut civ = Civilization::new(CivId(1), "Testland", leader);
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
        civ
    }

    #[test]
    fn test_advise_is_deterministic() {
        let mut civ = court();
        let id = civ.active_advisors().next().unwrap().id;
        let ctx = DecisionContext::council_session(1);
        let config = EngineConfig::default();

        let a = advise(&mut civ, id, &ctx, &config).unwrap();
        let b = advise(&mut civ, id, &ctx, &config).unwrap();
        assert_eq!(a.option, b.option);
        assert_eq!(a.conviction, b.conviction);
    }

    #[test]
    fn test_advise_respects_role() {
        let mut civ = court();
        let general = AdvisorId(1);
        let treasurer = AdvisorId(2);
        let ctx = DecisionContext::council_session(1);
        let config = EngineConfig::default();

        let military = advise(&mut civ, general, &ctx, &config).unwrap();
        let economic = advise(&mut civ, treasurer, &ctx, &config).unwrap();
        assert_eq!(military.option, PolicyOption::MilitaryBuildup);
        assert_eq!(economic.option, PolicyOption::EconomicFocus);
    }

    #[test]
    fn test_coup_memories_push_toward_security() {
        let mut civ = court();
        let id = civ.appoint(
            "Warden Cora",
            AdvisorRole::Diplomatic,
            Personality::default(),
            0,
        );
        for i in 0..4 {
            civ.memory
                .store(
                    id,
                    MemoryDraft::new(EventId(i), "a coup was attempted", -0.9, 1.0)
                        .with_tags(&[MemoryTag::Coup]),
                    1,
                )
                .unwrap();
        }

        let ctx = DecisionContext::council_session(1);
        let config = EngineConfig::default();
        let advice = advise(&mut civ, id, &ctx, &config).unwrap();
        assert_eq!(
            advice.option,
            PolicyOption::InternalSecurity,
            "fresh coup memories should override the diplomatic instinct"
        );
    }

    #[test]
    fn test_advise_rejects_terminal_advisor() {
        let mut civ = court();
        let id = civ.active_advisors().next().unwrap().id;
        civ.set_status(id, crate::core::types::AdvisorStatus::Dismissed)
            .unwrap();

        let ctx = DecisionContext::council_session(1);
        let config = EngineConfig::default();
        assert!(advise(&mut civ, id, &ctx, &config).is_err());
    }

    #[test]
    fn test_disloyal_advice_carries_negative_valence() {
        let mut civ = court();
        let id = civ.active_advisors().next().unwrap().id;
        civ.advisor_mut(id).unwrap().loyalty = 0.05;

        let ctx = DecisionContext::council_session(1);
        let config = EngineConfig::default();
        let advice = advise(&mut civ, id, &ctx, &config).unwrap();
        assert!(advice.valence < 0.0);
    }

    #[test]
    fn test_decide_follows_trusted_counsel() {
        let mut civ = court();
        let general = AdvisorId(1);
        civ.leader.trust.insert(general, 0.9);
        civ.advisor_mut(general).unwrap().influence = 0.9;

        let ctx = DecisionContext::council_session(1);
        let advice = vec![Advice {
            advisor: general,
            option: PolicyOption::MilitaryBuildup,
            conviction: 1.0,
            valence: 0.5,
            rationale: None,
        }];

        let decision = decide(&civ, &advice, &ctx);
        assert_eq!(decision.option, PolicyOption::MilitaryBuildup);
    }

    #[test]
    fn test_decide_without_advice_is_deterministic() {
        let civ = court();
        let ctx = DecisionContext::council_session(1);
        let a = decide(&civ, &[], &ctx);
        let b = decide(&civ, &[], &ctx);
        assert_eq!(a.option, b.option);
    }

    #[test]
    fn test_decision_event_negative_majority() {
        let advice = vec![
            Advice {
                advisor: AdvisorId(1),
                option: PolicyOption::Diplomacy,
                conviction: 0.8,
                valence: -0.5,
                rationale: None,
            },
            Advice {
                advisor: AdvisorId(2),
                option: PolicyOption::Diplomacy,
                conviction: 0.7,
                valence: -0.3,
                rationale: None,
            },
            Advice {
                advisor: AdvisorId(3),
                option: PolicyOption::MilitaryBuildup,
                conviction: 0.9,
                valence: 0.4,
                rationale: None,
            },
        ];
        let decision = Decision {
            option: PolicyOption::MilitaryBuildup,
            confidence: 0.8,
            rationale: None,
        };

        let (kind, participants) = decision_event(&advice, &decision);
        assert_eq!(participants.len(), 3);
        match kind {
            EventKind::LeaderDecision {
                followed,
                overridden,
                negative_majority,
                ..
            } => {
                assert_eq!(followed, vec![AdvisorId(3)]);
                assert_eq!(overridden, vec![AdvisorId(1), AdvisorId(2)]);
                assert!(negative_majority);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    mod backend {
        use super::*;
        use crate::core::error::PoliticsError;

        struct CannedBackend {
            response: BackendResponse,
        }

        impl GenerativeCapability for CannedBackend {
            async fn generate(&self, _request: &AdviceRequest) -> crate::core::error::Result<BackendResponse> {
                Ok(self.response.clone())
            }
        }

        struct SlowBackend;

        impl GenerativeCapability for SlowBackend {
            async fn generate(&self, _request: &AdviceRequest) -> crate::core::error::Result<BackendResponse> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(PoliticsError::ExternalCapability("unreachable".into()))
            }
        }

        #[tokio::test]
        async fn test_valid_backend_response_is_used() {
            let mut civ = court();
            let id = civ.active_advisors().next().unwrap().id;
            let ctx = DecisionContext::council_session(1);
            let config = EngineConfig::default();
            let backend = CannedBackend {
                response: BackendResponse {
                    action: "CULTURAL_PATRONAGE".into(),
                    confidence: 0.7,
                    rationale: Some("festivals calm the streets".into()),
                },
            };

            let (advice, fell_back) =
                advise_with_capability(&mut civ, id, &ctx, &config, &backend)
                    .await
                    .unwrap();
            assert!(!fell_back);
            assert_eq!(advice.option, PolicyOption::CulturalPatronage);
            assert_eq!(advice.conviction, 0.7);
            assert!(advice.rationale.is_some());
        }

        #[tokio::test]
        async fn test_timeout_falls_back_to_rules() {
            let mut civ = court();
            let id = civ.active_advisors().next().unwrap().id;
            let ctx = DecisionContext::council_session(1);
            let config = EngineConfig {
                backend_timeout_ms: 20,
                ..Default::default()
            };

            let (advice, fell_back) =
                advise_with_capability(&mut civ, id, &ctx, &config, &SlowBackend)
                    .await
                    .unwrap();
            let expected = advise(&mut civ, id, &ctx, &config).unwrap();

            assert!(fell_back);
            assert_eq!(advice.option, expected.option);
            assert_eq!(advice.advisor, expected.advisor);
        }

        #[tokio::test]
        async fn test_malformed_action_falls_back() {
            let mut civ = court();
            let id = civ.active_advisors().next().unwrap().id;
            let ctx = DecisionContext::council_session(1);
            let config = EngineConfig::default();
            let backend = CannedBackend {
                response: BackendResponse {
                    action: "BURN_EVERYTHING".into(),
                    confidence: 0.9,
                    rationale: None,
                },
            };

            let (advice, fell_back) =
                advise_with_capability(&mut civ, id, &ctx, &config, &backend)
                    .await
                    .unwrap();
            let expected = advise(&mut civ, id, &ctx, &config).unwrap();

            assert!(fell_back);
            assert_eq!(advice.option, expected.option);
        }

        #[tokio::test]
        async fn test_gather_reconciles_by_advisor_id() {
            let mut civ = court();
            let ctx = DecisionContext::council_session(1);
            let config = EngineConfig::default();
            let backend = CannedBackend {
                response: BackendResponse {
                    action: "DIPLOMACY".into(),
                    confidence: 0.6,
                    rationale: None,
                },
            };

            let (advice_set, fallbacks) =
                gather_advice(&mut civ, &ctx, &config, &backend).await;
            assert_eq!(fallbacks, 0);
            let ids: Vec<AdvisorId> = advice_set.iter().map(|a| a.advisor).collect();
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            assert_eq!(ids, sorted, "results must reconcile in advisor-id order");
        }
    }
}
