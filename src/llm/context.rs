//! Build context packages and prompts for the generative capability
//!
//! The package carries exactly what the contract names: a personality
//! summary, a filtered memory excerpt, a relationship snapshot and the
//! decision context. Conspiracy state is structurally absent.

use uuid::Uuid;

use crate::civilization::Civilization;
use crate::core::types::{ActorRef, AdvisorId};
use crate::decision::DecisionContext;
use crate::llm::{AdviceRequest, RelationSummary};
use crate::memory::Memory;

/// Build the request package for one advisor's advice query
pub fn build_advice_request(
    civ: &Civilization,
    advisor_id: AdvisorId,
    recalled: &[Memory],
    ctx: &DecisionContext,
) -> Option<AdviceRequest> {
    let advisor = civ.advisor(advisor_id)?;

    let memory_excerpt = recalled
        .iter()
        .take(8)
        .map(|m| {
            format!(
                "[turn {}] {} (reliability {:.2})",
                m.created_turn, m.content, m.reliability
            )
        })
        .collect();

    let me = ActorRef::Advisor(advisor_id);
    let mut relationships: Vec<RelationSummary> = civ
        .relations
        .edges_from(me)
        .map(|(target, edge)| RelationSummary {
            target: match target {
                ActorRef::Leader => civ.leader.name.clone(),
                ActorRef::Advisor(id) => civ
                    .advisor(id)
                    .map_or_else(|| format!("advisor {}", id.0), |a| a.name.clone()),
            },
            trust: edge.trust,
        })
        .collect();
    relationships.sort_by(|a, b| a.target.cmp(&b.target));

    Some(AdviceRequest {
        request_id: Uuid::new_v4(),
        actor_name: advisor.name.clone(),
        actor_role: format!("{:?}", advisor.role),
        personality_summary: advisor.personality.summary(),
        loyalty: advisor.loyalty,
        influence: advisor.influence,
        memory_excerpt,
        relationships,
        decision_subject: ctx.subject.clone(),
        urgency: ctx.urgency,
        options: ctx.options.iter().map(|o| o.code().to_string()).collect(),
    })
}

/// Render (system, user) prompts for a request
pub fn render_prompts(request: &AdviceRequest) -> (String, String) {
    let user = format!(
        "ADVISOR: {} ({})\nPERSONALITY: {}\nLOYALTY: {:.2}  INFLUENCE: {:.2}\n\nRELEVANT MEMORIES:\n{}\n\nRELATIONSHIPS:\n{}\n\nMATTER BEFORE THE COUNCIL (urgency {:.2}):\n{}\n\nOPTIONS: {}\n\nRespond with JSON only:",
        request.actor_name,
        request.actor_role,
        request.personality_summary,
        request.loyalty,
        request.influence,
        if request.memory_excerpt.is_empty() {
            "(none)".to_string()
        } else {
            request.memory_excerpt.join("\n")
        },
        request
            .relationships
            .iter()
            .map(|r| format!("{}: trust {:.2}", r.target, r.trust))
            .collect::<Vec<_>>()
            .join("\n"),
        request.urgency,
        request.decision_subject,
        request.options.join(", "),
    );

    (ADVISE_SYSTEM_PROMPT.to_string(), user)
}

/// System prompt for the advice query
pub const ADVISE_SYSTEM_PROMPT: &str = r#"You are roleplaying one advisor at a royal court in a strategy game.
Stay in character: answer from the advisor's personality, memories and relationships, not from an omniscient view.

Pick exactly one of the offered OPTIONS.

OUTPUT FORMAT (JSON only, no explanation outside the JSON):
{
  "action": "ONE_OF_THE_OFFERED_OPTION_CODES",
  "confidence": 0.0-1.0,
  "rationale": "one or two sentences in the advisor's voice"
}
"#;
