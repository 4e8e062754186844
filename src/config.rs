//! Configuration for paycheck analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. The defaults reproduce the production setup:
//! the Gemini REST backend, a near-deterministic temperature and no timeout
//! of our own.

use crate::backend::gemini::DEFAULT_ENDPOINT;
use crate::backend::InferenceService;
use crate::error::AuditError;
use crate::pipeline::enhance::RenderSupport;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Inline-payload ceiling of the inference service.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Environment variables searched, in order, for the Gemini credential.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Configuration for one or many analyses.
///
/// # Example
/// ```rust
/// use transfer_audit::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-2.5-flash")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_model(), "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier. `None` uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Provider name for the multi-provider backend (`"openai"`,
    /// `"anthropic"`, …). `None` or `"gemini"` uses the Gemini REST backend.
    pub provider_name: Option<String>,

    /// Pre-constructed service. Takes precedence over everything else.
    pub service: Option<Arc<dyn InferenceService>>,

    /// Gemini credential. `None` falls back to [`API_KEY_ENV_VARS`].
    pub api_key: Option<String>,

    /// Base URL of the generative-language API.
    pub endpoint: String,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Output token budget. Default: 8192.
    pub max_tokens: usize,

    /// HTTP timeout for the service call. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Whether image enhancement can run. `Unavailable` sends images as-is.
    pub render_support: RenderSupport,

    /// Largest document accepted from disk. Default: 20 MiB.
    pub max_document_bytes: usize,

    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            service: None,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.1,
            max_tokens: 8192,
            api_timeout_secs: None,
            render_support: RenderSupport::Available,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("render_support", &self.render_support)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Explicit key, else the first non-empty environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .filter_map(|v| std::env::var(v).ok())
                    .find(|k| !k.trim().is_empty())
            })
    }

    /// True when the Gemini REST backend should be used.
    pub fn uses_gemini_rest(&self) -> bool {
        self.provider_name
            .as_deref()
            .map_or(true, |p| p.eq_ignore_ascii_case("gemini"))
    }
}

/// Builder for [`AnalysisConfig`].
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl fmt::Debug for AnalysisConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.config, f)
    }
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn service(mut self, service: Arc<dyn InferenceService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn render_support(mut self, support: RenderSupport) -> Self {
        self.config.render_support = support;
        self
    }

    pub fn max_document_bytes(mut self, n: usize) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AuditError> {
        let c = &self.config;
        if c.max_document_bytes == 0 {
            return Err(AuditError::InvalidConfig(
                "max_document_bytes must be > 0".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(AuditError::InvalidConfig("max_tokens must be > 0".into()));
        }
        if c.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(AuditError::InvalidConfig("model must not be empty".into()));
        }
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(AuditError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.effective_model(), "gemini-3-pro-preview");
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 8192);
        assert_eq!(c.api_timeout_secs, None);
        assert_eq!(c.render_support, RenderSupport::Available);
        assert_eq!(c.max_document_bytes, 20 * 1024 * 1024);
        assert!(c.uses_gemini_rest());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = AnalysisConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
        let c = AnalysisConfig::builder().temperature(-1.0).build().unwrap();
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(AnalysisConfig::builder().max_document_bytes(0).build().is_err());
        assert!(AnalysisConfig::builder().max_tokens(0).build().is_err());
        assert!(AnalysisConfig::builder().model("  ").build().is_err());
        assert!(AnalysisConfig::builder().endpoint("ftp://x").build().is_err());
    }

    #[test]
    fn provider_routing() {
        let c = AnalysisConfig::builder().provider_name("Gemini").build().unwrap();
        assert!(c.uses_gemini_rest());
        let c = AnalysisConfig::builder().provider_name("openai").build().unwrap();
        assert!(!c.uses_gemini_rest());
    }

    #[test]
    fn explicit_key_wins() {
        let c = AnalysisConfig::builder().api_key("abc").build().unwrap();
        assert_eq!(c.resolve_api_key().as_deref(), Some("abc"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = AnalysisConfig::builder().api_key("top-secret").build().unwrap();
        let s = format!("{c:?}");
        assert!(!s.contains("top-secret"));
        assert!(s.contains("<redacted>"));
    }
}
