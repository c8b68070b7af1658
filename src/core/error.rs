use thiserror::Error;

/// Engine error taxonomy
///
/// Only `StateCorruption` (snapshot load failure) is allowed to halt the
/// surrounding system. Everything else is absorbed within the turn:
/// data-consistency faults drop the offending event, external-capability
/// faults trigger the rule-based fallback, invariant violations clamp.
#[derive(Error, Debug)]
pub enum PoliticsError {
    #[error("data consistency fault: {0}")]
    DataConsistency(String),

    #[error("external capability fault: {0}")]
    ExternalCapability(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("state corruption: {0}")]
    StateCorruption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PoliticsError>;
