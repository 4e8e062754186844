//! One-shot analysis entry points.
//!
//! Each call runs the whole pipeline once and returns the result directly.
//! Use [`crate::Analyzer`] instead when a long-lived session needs the
//! selected-document / current-result state and the in-flight guard.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::backend::{GeminiBackend, InferenceService, ProviderBackend};
use crate::config::{AnalysisConfig, API_KEY_ENV_VARS};
use crate::document::UploadedDocument;
use crate::error::AuditError;
use crate::pipeline::{input, llm, normalize, parse};
use crate::progress::AnalysisPhase;
use crate::report::{cross_check, AnalysisResult};

/// Analyze a paycheck on disk.
///
/// # Errors
/// I/O failures, an unsupported format, a failed service call or a response
/// that is not a valid report. See [`AuditError::user_message`] for the text
/// to show the user.
pub async fn analyze(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AuditError> {
    let path = path.as_ref();
    info!("Starting analysis: {}", path.display());
    match input::load_document(path, config.max_document_bytes).await {
        Ok(document) => analyze_document(&document, config).await,
        Err(e) => Err(notify_failure(config, e)),
    }
}

/// Analyze an in-memory upload with its declared media type.
pub async fn analyze_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    declared_type: impl Into<String>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AuditError> {
    let document = UploadedDocument::new(name, bytes, declared_type);
    if document.size_bytes() > config.max_document_bytes {
        let e = AuditError::DocumentTooLarge {
            size: document.size_bytes(),
            limit: config.max_document_bytes,
        };
        return Err(notify_failure(config, e));
    }
    analyze_document(&document, config).await
}

/// Analyze an already-loaded document. An empty document is
/// [`AuditError::NoDocument`].
pub async fn analyze_document(
    document: &UploadedDocument,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AuditError> {
    if document.bytes.is_empty() {
        return Err(notify_failure(config, AuditError::NoDocument));
    }

    let outcome = match resolve_service(config) {
        Ok(service) => run_pipeline(document.clone(), service.as_ref(), config, |_| {}).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(result) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_analysis_complete(&result.report);
            }
            Ok(result)
        }
        Err(e) => Err(notify_failure(config, e)),
    }
}

/// Blocking wrapper around [`analyze`]. Creates its own runtime.
pub fn analyze_sync(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AuditError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AuditError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(path, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Tell the progress callback about a terminal failure, then hand it back.
fn notify_failure(config: &AnalysisConfig, e: AuditError) -> AuditError {
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_failed(&e.user_message());
    }
    e
}

/// Pick the inference backend, from most-specific to least-specific:
///
/// 1. a pre-built service on the config;
/// 2. a named non-Gemini provider through `edgequake_llm`;
/// 3. the Gemini REST backend with the configured or environment credential.
pub(crate) fn resolve_service(
    config: &AnalysisConfig,
) -> Result<Arc<dyn InferenceService>, AuditError> {
    if let Some(ref service) = config.service {
        return Ok(Arc::clone(service));
    }

    if !config.uses_gemini_rest() {
        let name = config.provider_name.as_deref().unwrap_or_default();
        let backend = ProviderBackend::from_name(name, config.effective_model())?;
        return Ok(Arc::new(backend));
    }

    let api_key = config
        .resolve_api_key()
        .ok_or_else(|| AuditError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: format!(
                "Set {} (or pass --api-key) with a generative-language API key.",
                API_KEY_ENV_VARS.join(" or ")
            ),
        })?;
    let timeout = config.api_timeout_secs.map(Duration::from_secs);
    Ok(Arc::new(GeminiBackend::new(
        api_key,
        config.endpoint.clone(),
        timeout,
    )?))
}

/// normalize → request → parse, reporting each phase to `on_phase` and to
/// the configured progress callback.
pub(crate) async fn run_pipeline<F>(
    document: UploadedDocument,
    service: &dyn InferenceService,
    config: &AnalysisConfig,
    on_phase: F,
) -> Result<AnalysisResult, AuditError>
where
    F: Fn(AnalysisPhase) + Send + Sync,
{
    let start = Instant::now();
    let phase = |p: AnalysisPhase| {
        on_phase(p);
        if let Some(ref cb) = config.progress_callback {
            cb.on_phase(p, p.label());
        }
    };

    // ── Step 1: Normalize ────────────────────────────────────────────────
    phase(AnalysisPhase::Normalizing);
    let normalized = normalize::normalize(document, config.render_support).await?;
    let media_type = normalized.payload.media_type;

    // ── Step 2: Request ──────────────────────────────────────────────────
    phase(AnalysisPhase::Requesting);
    let request = llm::build_request(normalized.payload, config);
    let raw = llm::request_analysis(service, &request).await?;

    // ── Step 3: Parse and validate ───────────────────────────────────────
    phase(AnalysisPhase::ParsingResponse);
    let report = parse::parse_report(&raw.text)?;

    let findings = cross_check(&report);
    for finding in &findings {
        warn!("Policy cross-check: {}", finding);
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Analysis done in {}ms: elegivel={} orgao={}",
        duration_ms, report.elegivel, report.orgao
    );

    Ok(AnalysisResult {
        report,
        findings,
        media_type,
        enhancement: normalized.enhancement,
        input_tokens: raw.input_tokens,
        output_tokens: raw.output_tokens,
        duration_ms,
    })
}
