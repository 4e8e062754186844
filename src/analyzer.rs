//! Session-level analysis orchestrator.
//!
//! An [`Analyzer`] owns the selected document, the current result, the
//! current error and the progress label, and serializes analyses: at most one
//! service call is in flight per analyzer. It is a cheap `Clone` handle, so a
//! UI task and a worker task can share one session.
//!
//! ```text
//! Idle ─▶ Normalizing ─▶ Requesting ─▶ ParsingResponse ─▶ Done
//!              │              │               │
//!              └──────────────┴───────────────┴─────────▶ Failed
//! ```
//!
//! Selecting a new document while a call is in flight does not cancel it.
//! The call runs to completion, but its outcome is dropped because the
//! session has moved on.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::analyze::{resolve_service, run_pipeline};
use crate::backend::InferenceService;
use crate::config::AnalysisConfig;
use crate::document::UploadedDocument;
use crate::error::AuditError;
use crate::progress::AnalysisPhase;
use crate::report::AnalysisResult;

/// Where the session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisState {
    Idle,
    Normalizing,
    Requesting,
    ParsingResponse,
    Done,
    Failed,
}

impl AnalysisState {
    pub fn is_working(self) -> bool {
        matches!(
            self,
            AnalysisState::Normalizing | AnalysisState::Requesting | AnalysisState::ParsingResponse
        )
    }
}

impl From<AnalysisPhase> for AnalysisState {
    fn from(p: AnalysisPhase) -> Self {
        match p {
            AnalysisPhase::Normalizing => AnalysisState::Normalizing,
            AnalysisPhase::Requesting => AnalysisState::Requesting,
            AnalysisPhase::ParsingResponse => AnalysisState::ParsingResponse,
        }
    }
}

/// What a call to [`Analyzer::start_analysis`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new report is current.
    Completed,
    /// The analysis failed; see [`Analyzer::error`].
    Failed,
    /// Nothing selected. No side effects.
    NoDocument,
    /// Another analysis is in flight. No side effects.
    AlreadyRunning,
    /// The document changed while this run was in flight; outcome dropped.
    Superseded,
}

#[derive(Debug)]
struct Session {
    state: AnalysisState,
    document: Option<UploadedDocument>,
    generation: u64,
    in_flight: bool,
    report: Option<Arc<AnalysisResult>>,
    error: Option<String>,
    progress_label: Option<&'static str>,
}

struct Inner {
    config: AnalysisConfig,
    service: Arc<dyn InferenceService>,
    session: Mutex<Session>,
}

/// Shared handle to one analysis session.
#[derive(Clone)]
pub struct Analyzer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("service", &self.inner.service.name())
            .field("session", &*self.session())
            .finish()
    }
}

impl Analyzer {
    /// Build an analyzer, resolving the inference backend from `config`.
    pub fn new(config: AnalysisConfig) -> Result<Self, AuditError> {
        let service = resolve_service(&config)?;
        Ok(Self::with_service(service, config))
    }

    pub fn with_service(service: Arc<dyn InferenceService>, config: AnalysisConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                service,
                session: Mutex::new(Session {
                    state: AnalysisState::Idle,
                    document: None,
                    generation: 0,
                    in_flight: false,
                    report: None,
                    error: None,
                    progress_label: None,
                }),
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.inner.session)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.inner.config
    }

    // ── Inbound ──────────────────────────────────────────────────────────

    /// Replace the selected document and discard the previous result and
    /// error. Allowed at any time.
    pub fn select_document(&self, document: UploadedDocument) {
        let mut s = self.session();
        debug!("Selected {:?}", document);
        s.document = Some(document);
        reset(&mut s);
    }

    /// Drop the document, the result and the error.
    pub fn clear(&self) {
        let mut s = self.session();
        s.document = None;
        reset(&mut s);
    }

    /// Run one analysis of the selected document.
    ///
    /// Returns immediately with [`StartOutcome::NoDocument`] or
    /// [`StartOutcome::AlreadyRunning`] without touching any state.
    pub async fn start_analysis(&self) -> StartOutcome {
        let (document, generation) = {
            let mut s = self.session();
            if s.in_flight {
                return StartOutcome::AlreadyRunning;
            }
            let Some(document) = s.document.clone() else {
                return StartOutcome::NoDocument;
            };
            s.in_flight = true;
            s.error = None;
            s.state = AnalysisState::Normalizing;
            s.progress_label = Some(AnalysisPhase::Normalizing.label());
            (document, s.generation)
        };

        let mut guard = InFlight {
            session: &self.inner.session,
            generation,
            armed: true,
        };

        let observer = |phase: AnalysisPhase| {
            let mut s = lock(&self.inner.session);
            if s.generation == generation {
                s.state = phase.into();
                s.progress_label = Some(phase.label());
            }
        };

        let result = run_pipeline(
            document,
            self.inner.service.as_ref(),
            &self.inner.config,
            observer,
        )
        .await;

        guard.armed = false;
        self.commit(generation, result)
    }

    fn commit(&self, generation: u64, result: Result<AnalysisResult, AuditError>) -> StartOutcome {
        let cb = self.inner.config.progress_callback.clone();
        let mut s = self.session();
        s.in_flight = false;

        if s.generation != generation {
            info!("Analysis superseded by a new selection; outcome dropped");
            return StartOutcome::Superseded;
        }

        s.progress_label = None;
        match result {
            Ok(result) => {
                let result = Arc::new(result);
                s.state = AnalysisState::Done;
                s.report = Some(Arc::clone(&result));
                drop(s);
                if let Some(cb) = cb {
                    cb.on_analysis_complete(&result.report);
                }
                StartOutcome::Completed
            }
            Err(e) => {
                let message = e.user_message();
                info!("Analysis failed: {}", e);
                s.state = AnalysisState::Failed;
                s.error = Some(message.clone());
                drop(s);
                if let Some(cb) = cb {
                    cb.on_analysis_failed(&message);
                }
                StartOutcome::Failed
            }
        }
    }

    // ── Outbound ─────────────────────────────────────────────────────────

    pub fn state(&self) -> AnalysisState {
        self.session().state
    }

    /// The last successful result. Survives later failures.
    pub fn report(&self) -> Option<Arc<AnalysisResult>> {
        self.session().report.clone()
    }

    /// User-facing message of the last failure, if the session is failed.
    pub fn error(&self) -> Option<String> {
        self.session().error.clone()
    }

    pub fn progress_label(&self) -> Option<&'static str> {
        self.session().progress_label
    }

    pub fn is_analyzing(&self) -> bool {
        self.session().in_flight
    }

    pub fn document_name(&self) -> Option<String> {
        self.session().document.as_ref().map(|d| d.name.clone())
    }
}

fn lock(m: &Mutex<Session>) -> MutexGuard<'_, Session> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn reset(s: &mut Session) {
    s.generation += 1;
    s.state = AnalysisState::Idle;
    s.report = None;
    s.error = None;
    s.progress_label = None;
}

/// Releases the in-flight flag if the run future is dropped before commit.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    generation: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut s = lock(self.session);
        s.in_flight = false;
        if s.generation == self.generation && s.state.is_working() {
            s.state = AnalysisState::Idle;
            s.progress_label = None;
        }
    }
}
