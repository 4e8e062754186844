//! The external inference boundary.
//!
//! One analysis is exactly one [`InferenceService::generate`] call: the
//! normalized document, the audit prompt and the report schema go in, raw
//! text comes out. Two implementations ship with the crate:
//!
//! * [`GeminiBackend`] calls the generative-language REST API directly and
//!   uses its native structured output (`responseSchema`).
//! * [`ProviderBackend`] wraps any `edgequake_llm` provider and restates the
//!   schema in the system message instead.
//!
//! Tests and embedders supply their own implementation through
//! [`crate::AnalysisConfig`].

use async_trait::async_trait;
use serde_json::Value;

use crate::document::NormalizedPayload;

pub mod gemini;
pub mod provider;

pub use gemini::GeminiBackend;
pub use provider::ProviderBackend;

/// Everything the service needs for one analysis.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub payload: NormalizedPayload,
    pub prompt: &'static str,
    pub schema: Value,
    pub temperature: f32,
    pub max_tokens: usize,
    pub model: String,
}

/// Raw service answer. `text` is `None` when the service returned no content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceResponse {
    pub text: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl InferenceResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// A failed call. `message` is the service's own text, if it gave one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFailure {
    pub message: Option<String>,
}

impl ServiceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn silent() -> Self {
        Self { message: None }
    }
}

impl From<ServiceFailure> for crate::error::AuditError {
    fn from(f: ServiceFailure) -> Self {
        crate::error::AuditError::ServiceError { message: f.message }
    }
}

/// A multimodal model that can read a paycheck and answer in JSON.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &InferenceRequest)
        -> Result<InferenceResponse, ServiceFailure>;
}
