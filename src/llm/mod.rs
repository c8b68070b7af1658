//! Generative-text capability behind a narrow interface
//!
//! The backend is inherently non-deterministic and latent, so it sits
//! behind a request/response trait with caller-enforced timeouts. The
//! rule-based engine and any future backend are interchangeable
//! implementations of the same contract; test doubles implement the same
//! trait.

pub mod client;
pub mod context;
pub mod parser;

pub use client::LlmClient;

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::Result;

/// Context package submitted to the generative capability
#[derive(Debug, Clone, Serialize)]
pub struct AdviceRequest {
    /// Correlation id for request tracing
    pub request_id: Uuid,
    pub actor_name: String,
    pub actor_role: String,
    pub personality_summary: String,
    pub loyalty: f32,
    pub influence: f32,
    /// Filtered memory recall, most salient first
    pub memory_excerpt: Vec<String>,
    pub relationships: Vec<RelationSummary>,
    pub decision_subject: String,
    pub urgency: f32,
    /// Wire codes of the candidate actions
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationSummary {
    pub target: String,
    pub trust: f32,
}

/// Structural contract every backend response must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Selected action; must match one of the offered option codes
    pub action: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// A request/response capability the engine calls and must tolerate failing
pub trait GenerativeCapability: Send + Sync {
    fn generate(
        &self,
        request: &AdviceRequest,
    ) -> impl Future<Output = Result<BackendResponse>> + Send;
}
