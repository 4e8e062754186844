//! Generic backend over any `edgequake_llm` provider.
//!
//! Providers behind this crate have no common structured-output switch, so
//! the schema is restated in the system message and the model is told to
//! answer with bare JSON. The validation gate downstream is the same either
//! way.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

use super::{InferenceRequest, InferenceResponse, InferenceService, ServiceFailure};
use crate::error::AuditError;
use crate::prompts::json_only_suffix;

pub struct ProviderBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Build a named provider (`"openai"`, `"anthropic"`, `"ollama"`, …).
    /// Credentials are read from the provider's own environment variables.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, AuditError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            AuditError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider_name, provider))
    }
}

fn build_messages(request: &InferenceRequest) -> Vec<ChatMessage> {
    let system = format!("{}{}", request.prompt, json_only_suffix(&request.schema));
    let image = ImageData::new(
        request.payload.data.clone(),
        request.payload.media_type.as_mime(),
    );
    vec![
        ChatMessage::system(&system),
        ChatMessage::user_with_images("", vec![image]),
    ]
}

fn build_options(request: &InferenceRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl InferenceService for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, ServiceFailure> {
        let messages = build_messages(request);
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ServiceFailure::new(format!("{e}")))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        let text = Some(response.content).filter(|t| !t.trim().is_empty());
        Ok(InferenceResponse {
            text,
            input_tokens: Some(response.prompt_tokens as u64),
            output_tokens: Some(response.completion_tokens as u64),
        })
    }
}
