//! Parse and validate generative-backend responses
//!
//! The response must satisfy the structural contract: a selected action
//! matching one of the offered option codes, a confidence in [0, 1], and
//! an optional rationale. Anything else is an external-capability fault
//! that the caller answers with the rule-based path.

use crate::core::error::{PoliticsError, Result};
use crate::decision::PolicyOption;
use crate::llm::BackendResponse;

/// Parse a raw completion into a structurally valid response
pub fn parse_response(text: &str) -> Result<BackendResponse> {
    let json = extract_json(text)?;

    let response: BackendResponse = serde_json::from_str(json).map_err(|e| {
        PoliticsError::ExternalCapability(format!(
            "malformed backend response: {} - response: {}",
            e, text
        ))
    })?;

    if !(0.0..=1.0).contains(&response.confidence) {
        return Err(PoliticsError::ExternalCapability(format!(
            "confidence {} outside [0, 1]",
            response.confidence
        )));
    }

    Ok(response)
}

/// Resolve the selected action against the offered options
pub fn validate_action(response: &BackendResponse, options: &[PolicyOption]) -> Result<PolicyOption> {
    let selected = PolicyOption::from_code(&response.action).ok_or_else(|| {
        PoliticsError::ExternalCapability(format!("unknown action code: {}", response.action))
    })?;

    if !options.contains(&selected) {
        return Err(PoliticsError::ExternalCapability(format!(
            "action {} was not among the offered options",
            response.action
        )));
    }
    Ok(selected)
}

/// Extract JSON object from LLM response (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response.find('{').ok_or_else(|| {
        PoliticsError::ExternalCapability("no JSON found in response".into())
    })?;
    let end = response.rfind('}').ok_or_else(|| {
        PoliticsError::ExternalCapability("no closing brace found in response".into())
    })?;
    Ok(&response[start..=end])
}
