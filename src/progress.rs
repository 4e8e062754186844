//! Progress-callback trait for analysis phase events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive the
//! phase labels as an analysis moves through normalization and the service
//! call. Labels are advisory text for a status line; they are not part of
//! the report.
//!
//! # Example
//!
//! ```rust
//! use transfer_audit::{AnalysisConfig, AnalysisPhase, AnalysisProgressCallback};
//! use std::sync::Arc;
//!
//! struct StatusLine;
//!
//! impl AnalysisProgressCallback for StatusLine {
//!     fn on_phase(&self, _phase: AnalysisPhase, label: &str) {
//!         eprintln!("{label}");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(StatusLine))
//!     .build()
//!     .unwrap();
//! ```

use crate::report::EligibilityReport;
use std::fmt;
use std::sync::Arc;

/// Working phases of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisPhase {
    Normalizing,
    Requesting,
    ParsingResponse,
}

impl AnalysisPhase {
    /// Status-line text shown while the phase runs.
    ///
    /// Parsing is instantaneous next to the service call, so it keeps the
    /// request label instead of flashing a new one.
    pub fn label(self) -> &'static str {
        match self {
            AnalysisPhase::Normalizing => "Otimizando legibilidade do documento...",
            AnalysisPhase::Requesting | AnalysisPhase::ParsingResponse => {
                "Cruzando dados com as regras do Banco..."
            }
        }
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline as an analysis advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// A phase has started.
    fn on_phase(&self, phase: AnalysisPhase, label: &str) {
        let _ = (phase, label);
    }

    /// The analysis produced a validated report.
    fn on_analysis_complete(&self, report: &EligibilityReport) {
        let _ = report;
    }

    /// The analysis failed. `message` is the user-facing text.
    fn on_analysis_failed(&self, message: &str) {
        let _ = message;
    }
}

/// The default when no callback is configured.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
