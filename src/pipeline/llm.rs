//! Inference call: one request per analysis, no retry.
//!
//! A failed call is terminal. The user re-triggers the analysis by hand, so
//! a quota or auth error is shown once instead of being hammered.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{InferenceRequest, InferenceService};
use crate::config::AnalysisConfig;
use crate::document::NormalizedPayload;
use crate::error::AuditError;
use crate::prompts::audit_prompt;
use crate::schema::report_schema;

/// Raw text returned by the service plus token usage.
#[derive(Debug, Clone)]
pub struct RawAnalysis {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

pub fn build_request(payload: NormalizedPayload, config: &AnalysisConfig) -> InferenceRequest {
    InferenceRequest {
        payload,
        prompt: audit_prompt(),
        schema: report_schema().clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        model: config.effective_model().to_string(),
    }
}

/// Send the request. Empty output is a malformed response.
pub async fn request_analysis(
    service: &dyn InferenceService,
    request: &InferenceRequest,
) -> Result<RawAnalysis, AuditError> {
    let start = Instant::now();
    info!("Requesting analysis from {} ({})", service.name(), request.model);

    let response = service.generate(request).await.map_err(|f| {
        warn!(
            "{} call failed after {:?}: {}",
            service.name(),
            start.elapsed(),
            f.message.as_deref().unwrap_or("no message")
        );
        AuditError::from(f)
    })?;

    debug!(
        "{}: {:?} input tokens, {:?} output tokens, {:?}",
        service.name(),
        response.input_tokens,
        response.output_tokens,
        start.elapsed()
    );

    let text = response
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AuditError::malformed("service returned no text"))?;

    Ok(RawAnalysis {
        text,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
    })
}
