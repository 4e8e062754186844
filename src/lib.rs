//! # transfer-audit
//!
//! Audit a paycheck (contracheque) for payroll-loan debt-transfer eligibility
//! with a generative vision model.
//!
//! The model reads the document against a fixed rulebook (net-income tiers,
//! Army PREC/CAT/IND codes, SIAPE statuses and blocked UPAGs, blocked
//! creditors) and answers with a structured report. The crate owns
//! everything around that call: the document preparation, the rulebook
//! prompt, the output schema, the validation gate and the session state.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / upload
//!  │
//!  ├─ 1. Input      read bytes, infer media type, size ceiling
//!  ├─ 2. Normalize  PDF passthrough; images → grayscale/contrast → JPEG
//!  ├─ 3. Request    payload + audit prompt + schema, one call, no retry
//!  ├─ 4. Parse      strip fences, decode, required-field gate
//!  └─ 5. Result     EligibilityReport + advisory policy findings
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use transfer_audit::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential from GEMINI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let result = analyze("contracheque.pdf", &config).await?;
//!     println!("elegível: {}", result.report.elegivel);
//!     println!("{}", result.report.motivo);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `transfer-audit` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod analyzer;
pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_bytes, analyze_document, analyze_sync};
pub use analyzer::{AnalysisState, Analyzer, StartOutcome};
pub use backend::{
    GeminiBackend, InferenceRequest, InferenceResponse, InferenceService, ProviderBackend,
    ServiceFailure,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use document::{MediaType, NormalizedPayload, UploadedDocument};
pub use error::AuditError;
pub use pipeline::enhance::{Enhancement, FallbackReason, RenderSupport};
pub use policy::{OperationTier, RoleVerdict};
pub use progress::{AnalysisPhase, AnalysisProgressCallback, NoopProgressCallback};
pub use prompts::audit_prompt;
pub use report::{
    cross_check, format_brl, AnalysisResult, DebtRecord, EligibilityReport, ExtractedData,
    Institution, PolicyFinding,
};
pub use schema::report_schema;
