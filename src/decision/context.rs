//! Decision inputs and outputs

use serde::{Deserialize, Serialize};

use crate::core::types::{AdvisorId, Turn};

/// Candidate courses of action put before the council
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyOption {
    MilitaryBuildup,
    Diplomacy,
    EconomicFocus,
    CulturalPatronage,
    ReligiousAppeal,
    InternalSecurity,
}

impl PolicyOption {
    pub const ALL: [PolicyOption; 6] = [
        PolicyOption::MilitaryBuildup,
        PolicyOption::Diplomacy,
        PolicyOption::EconomicFocus,
        PolicyOption::CulturalPatronage,
        PolicyOption::ReligiousAppeal,
        PolicyOption::InternalSecurity,
    ];

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|o| o == self).unwrap_or(0)
    }

    /// Wire code used in backend requests and responses
    pub fn code(&self) -> &'static str {
        match self {
            PolicyOption::MilitaryBuildup => "MILITARY_BUILDUP",
            PolicyOption::Diplomacy => "DIPLOMACY",
            PolicyOption::EconomicFocus => "ECONOMIC_FOCUS",
            PolicyOption::CulturalPatronage => "CULTURAL_PATRONAGE",
            PolicyOption::ReligiousAppeal => "RELIGIOUS_APPEAL",
            PolicyOption::InternalSecurity => "INTERNAL_SECURITY",
        }
    }

    /// Human-readable label for headlines
    pub fn label(&self) -> &'static str {
        match self {
            PolicyOption::MilitaryBuildup => "a military buildup",
            PolicyOption::Diplomacy => "a diplomatic overture",
            PolicyOption::EconomicFocus => "an economic program",
            PolicyOption::CulturalPatronage => "cultural patronage",
            PolicyOption::ReligiousAppeal => "a religious appeal",
            PolicyOption::InternalSecurity => "internal security",
        }
    }

    pub fn from_code(code: &str) -> Option<PolicyOption> {
        let code = code.trim().to_uppercase();
        Self::ALL.iter().copied().find(|o| o.code() == code)
    }
}

/// What the council is being asked about this turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub turn: Turn,
    pub subject: String,
    /// How pressing the matter is, in [0, 1]
    pub urgency: f32,
    pub options: Vec<PolicyOption>,
}

impl DecisionContext {
    /// The default standing agenda: where should the realm's attention go
    pub fn council_session(turn: Turn) -> Self {
        Self {
            turn,
            subject: "allocation of the realm's attention this season".into(),
            urgency: 0.3,
            options: PolicyOption::ALL.to_vec(),
        }
    }
}

/// One advisor's recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub advisor: AdvisorId,
    pub option: PolicyOption,
    /// Strength of the recommendation, in [0, 1]
    pub conviction: f32,
    /// Emotional tone toward the crown, in [-1, 1]
    pub valence: f32,
    pub rationale: Option<String>,
}

/// The leader's selected course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub option: PolicyOption,
    /// Confidence in the selection, in [0, 1]
    pub confidence: f32,
    pub rationale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for option in PolicyOption::ALL {
            assert_eq!(PolicyOption::from_code(option.code()), Some(option));
        }
    }

    #[test]
    fn test_from_code_case_insensitive() {
        assert_eq!(
            PolicyOption::from_code(" diplomacy "),
            Some(PolicyOption::Diplomacy)
        );
    }

    #[test]
    fn test_from_code_rejects_unknown() {
        assert_eq!(PolicyOption::from_code("CONQUER_THE_MOON"), None);
    }

    #[test]
    fn test_serde_uses_wire_codes() {
        let json = serde_json::to_string(&PolicyOption::InternalSecurity).unwrap();
        assert_eq!(json, "\"INTERNAL_SECURITY\"");
    }

    #[test]
    fn test_council_session_offers_everything() {
        let ctx = DecisionContext::council_session(3);
        assert_eq!(ctx.options.len(), PolicyOption::ALL.len());
        assert_eq!(ctx.turn, 3);
    }
}
