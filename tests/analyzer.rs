//! Integration tests for the `Analyzer` session state machine.
//!
//! A scripted `InferenceService` stands in for the model: it counts calls,
//! records the last request, and can hold a call open on a `Notify` gate so
//! the tests can observe the session while a request is in flight.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use transfer_audit::error::{
    GENERIC_SERVICE_MESSAGE, MALFORMED_RESPONSE_MESSAGE, UNSUPPORTED_FORMAT_MESSAGE,
};
use transfer_audit::{
    audit_prompt, AnalysisConfig, AnalysisPhase, AnalysisProgressCallback, AnalysisState,
    Analyzer, EligibilityReport, Enhancement, InferenceRequest, InferenceResponse,
    InferenceService, MediaType, RenderSupport, ServiceFailure, StartOutcome, UploadedDocument,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

const REPORT: &str = r#"```json
{
  "legivel": true,
  "orgao": "Exército",
  "elegivel": true,
  "alertaBancosBloqueados": false,
  "motivo": "Aprovado: PREC 10 é ativo de carreira e o líquido de R$ 1.250,00 suporta a faixa máxima.",
  "dadosExtraidos": {
    "nome": "FULANO DE TAL",
    "cpf": "123.456.789-00",
    "precCatInd": "10 / 1 / 1",
    "liquido": 1250.0,
    "faixaOperacao": "Liberado para operações de R$ 50.000,00 até R$ 195.000,00",
    "dividasIdentificadas": [
      { "banco": "BANCO DO BRASIL", "valorParcela": 412.9, "prazoRestante": "52" },
      { "banco": "CAIXA", "valorParcela": 120.0, "prazoRestante": "12" }
    ]
  }
}
```"#;

type Reply = Result<InferenceResponse, ServiceFailure>;

#[derive(Default)]
struct Scripted {
    calls: AtomicUsize,
    replies: Mutex<VecDeque<Reply>>,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    last_request: Mutex<Option<InferenceRequest>>,
}

impl Scripted {
    fn replying(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        })
    }

    fn gated(replies: impl IntoIterator<Item = Reply>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            gate: Some(gate),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_media_type(&self) -> Option<MediaType> {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.payload.media_type)
    }
}

#[async_trait]
impl InferenceService for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceResponse, ServiceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.entered.notify_one();
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(InferenceResponse::text("sem resposta")))
    }
}

fn ok() -> Reply {
    Ok(InferenceResponse {
        text: Some(REPORT.to_string()),
        input_tokens: Some(1800),
        output_tokens: Some(420),
    })
}

fn analyzer(service: Arc<Scripted>) -> Analyzer {
    Analyzer::with_service(service, AnalysisConfig::default())
}

fn pdf() -> UploadedDocument {
    UploadedDocument::new(
        "contracheque.pdf",
        b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec(),
        "application/pdf",
    )
}

fn png() -> UploadedDocument {
    let img = image::RgbImage::from_pixel(12, 12, image::Rgb([180, 170, 150]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    UploadedDocument::new("foto.png", buf, "image/png")
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn completes_with_validated_report() {
    let svc = Scripted::replying([ok()]);
    let a = analyzer(Arc::clone(&svc));
    a.select_document(pdf());

    assert_eq!(a.start_analysis().await, StartOutcome::Completed);
    assert_eq!(a.state(), AnalysisState::Done);
    assert_eq!(a.error(), None);
    assert_eq!(a.progress_label(), None);
    assert!(!a.is_analyzing());

    let result = a.report().expect("report after Done");
    assert_eq!(result.report.orgao, "Exército");
    assert_eq!(result.report.dados_extraidos.dividas_identificadas.len(), 2);
    assert_eq!(
        result.report.dados_extraidos.dividas_identificadas[0].banco,
        "BANCO DO BRASIL"
    );
    assert!(result.findings.is_empty(), "{:?}", result.findings);
    assert_eq!(result.enhancement, Enhancement::NotApplicable);
    assert_eq!(result.input_tokens, Some(1800));

    assert_eq!(svc.calls(), 1);
    let req = svc.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(req.payload.media_type, MediaType::Pdf);
    assert_eq!(req.prompt, audit_prompt());
    assert!(req.temperature <= 0.2);
}

#[tokio::test]
async fn images_are_sent_as_enhanced_jpeg() {
    let svc = Scripted::replying([ok()]);
    let a = analyzer(Arc::clone(&svc));
    a.select_document(png());
    assert_eq!(a.start_analysis().await, StartOutcome::Completed);
    assert_eq!(svc.last_media_type(), Some(MediaType::Jpeg));
    assert_eq!(a.report().unwrap().enhancement, Enhancement::Applied);
}

#[tokio::test]
async fn without_rendering_images_go_out_untouched() {
    let svc = Scripted::replying([ok()]);
    let config = AnalysisConfig::builder()
        .render_support(RenderSupport::Unavailable)
        .build()
        .unwrap();
    let a = Analyzer::with_service(Arc::clone(&svc) as Arc<dyn InferenceService>, config);
    a.select_document(png());
    assert_eq!(a.start_analysis().await, StartOutcome::Completed);
    assert_eq!(svc.last_media_type(), Some(MediaType::Png));
    assert!(matches!(
        a.report().unwrap().enhancement,
        Enhancement::Fallback(_)
    ));
}

// ── Entry guards ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_document_is_a_noop() {
    let svc = Scripted::replying([ok()]);
    let a = analyzer(Arc::clone(&svc));
    assert_eq!(a.start_analysis().await, StartOutcome::NoDocument);
    assert_eq!(a.state(), AnalysisState::Idle);
    assert_eq!(svc.calls(), 0);
}

#[tokio::test]
async fn second_start_while_requesting_has_no_effect() {
    let gate = Arc::new(Notify::new());
    let svc = Scripted::gated([ok(), ok()], Arc::clone(&gate));
    let a = analyzer(Arc::clone(&svc));
    a.select_document(pdf());

    let first = tokio::spawn({
        let a = a.clone();
        async move { a.start_analysis().await }
    });
    svc.entered.notified().await;

    assert_eq!(a.state(), AnalysisState::Requesting);
    assert_eq!(a.progress_label(), Some(AnalysisPhase::Requesting.label()));
    assert!(a.is_analyzing());

    assert_eq!(a.start_analysis().await, StartOutcome::AlreadyRunning);
    assert_eq!(svc.calls(), 1);
    assert_eq!(a.state(), AnalysisState::Requesting);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), StartOutcome::Completed);
    assert_eq!(svc.calls(), 1);
    assert_eq!(a.state(), AnalysisState::Done);
}

// ── Error taxonomy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_response_fails_with_generic_message() {
    let svc = Scripted::replying([Ok(InferenceResponse::text("{\"legivel\": true"))]);
    let a = analyzer(svc);
    a.select_document(pdf());
    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(a.state(), AnalysisState::Failed);
    assert_eq!(a.error().as_deref(), Some(MALFORMED_RESPONSE_MESSAGE));
    assert!(a.report().is_none());
}

#[tokio::test]
async fn missing_required_field_fails() {
    let without_motivo = REPORT.replace("\"motivo\"", "\"observacao\"");
    let svc = Scripted::replying([Ok(InferenceResponse::text(without_motivo))]);
    let a = analyzer(svc);
    a.select_document(pdf());
    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(a.error().as_deref(), Some(MALFORMED_RESPONSE_MESSAGE));
}

#[tokio::test]
async fn empty_response_fails_as_malformed() {
    let svc = Scripted::replying([Ok(InferenceResponse::default())]);
    let a = analyzer(svc);
    a.select_document(pdf());
    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(a.error().as_deref(), Some(MALFORMED_RESPONSE_MESSAGE));
}

#[tokio::test]
async fn service_message_is_surfaced_verbatim() {
    let svc = Scripted::replying([
        Err(ServiceFailure::new("Resource has been exhausted (e.g. check quota).")),
        Err(ServiceFailure::silent()),
    ]);
    let a = analyzer(Arc::clone(&svc));
    a.select_document(pdf());

    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(
        a.error().as_deref(),
        Some("Resource has been exhausted (e.g. check quota).")
    );

    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(a.error().as_deref(), Some(GENERIC_SERVICE_MESSAGE));
    assert_eq!(svc.calls(), 2);
}

#[tokio::test]
async fn unsupported_format_fails_before_any_call() {
    let svc = Scripted::replying([ok()]);
    let a = analyzer(Arc::clone(&svc));
    a.select_document(UploadedDocument::new("anim.gif", b"GIF89a".to_vec(), "image/gif"));

    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(a.error().as_deref(), Some(UNSUPPORTED_FORMAT_MESSAGE));
    assert_eq!(svc.calls(), 0);
}

// ── Result lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failure_keeps_previous_report() {
    let svc = Scripted::replying([
        ok(),
        Ok(InferenceResponse::text("desculpe")),
        ok(),
    ]);
    let a = analyzer(svc);
    a.select_document(pdf());

    assert_eq!(a.start_analysis().await, StartOutcome::Completed);
    let first = a.report().unwrap();

    assert_eq!(a.start_analysis().await, StartOutcome::Failed);
    assert_eq!(a.state(), AnalysisState::Failed);
    let kept = a.report().expect("prior report survives a failure");
    assert!(Arc::ptr_eq(&first, &kept));
    assert!(a.error().is_some());

    // a new start clears the error; a new Done replaces the report
    assert_eq!(a.start_analysis().await, StartOutcome::Completed);
    assert_eq!(a.error(), None);
    assert!(!Arc::ptr_eq(&first, &a.report().unwrap()));
}

#[tokio::test]
async fn selecting_a_document_clears_result_and_error() {
    let svc = Scripted::replying([ok(), Err(ServiceFailure::new("boom"))]);
    let a = analyzer(svc);
    a.select_document(pdf());
    a.start_analysis().await;
    a.start_analysis().await;
    assert!(a.report().is_some() && a.error().is_some());

    a.select_document(png());
    assert_eq!(a.state(), AnalysisState::Idle);
    assert!(a.report().is_none());
    assert!(a.error().is_none());
    assert_eq!(a.document_name().as_deref(), Some("foto.png"));

    a.clear();
    assert_eq!(a.document_name(), None);
    assert_eq!(a.start_analysis().await, StartOutcome::NoDocument);
}

#[tokio::test]
async fn new_selection_supersedes_in_flight_run() {
    let gate = Arc::new(Notify::new());
    let svc = Scripted::gated([ok(), ok()], Arc::clone(&gate));
    let a = analyzer(Arc::clone(&svc));
    a.select_document(pdf());

    let first = tokio::spawn({
        let a = a.clone();
        async move { a.start_analysis().await }
    });
    svc.entered.notified().await;

    a.select_document(png());
    assert_eq!(a.state(), AnalysisState::Idle);
    // the old call still occupies the single slot
    assert!(a.is_analyzing());
    assert_eq!(a.start_analysis().await, StartOutcome::AlreadyRunning);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), StartOutcome::Superseded);
    assert!(a.report().is_none());
    assert_eq!(a.state(), AnalysisState::Idle);
    assert!(!a.is_analyzing());

    gate.notify_one();
    assert_eq!(a.start_analysis().await, StartOutcome::Completed);
    assert_eq!(svc.last_media_type(), Some(MediaType::Jpeg));
}

#[tokio::test]
async fn clearing_during_flight_supersedes_the_run() {
    let gate = Arc::new(Notify::new());
    let svc = Scripted::gated([ok()], Arc::clone(&gate));
    let a = analyzer(Arc::clone(&svc));
    a.select_document(pdf());

    let run = tokio::spawn({
        let a = a.clone();
        async move { a.start_analysis().await }
    });
    svc.entered.notified().await;

    a.clear();
    assert_eq!(a.state(), AnalysisState::Idle);
    assert_eq!(a.document_name(), None);

    gate.notify_one();
    assert_eq!(run.await.unwrap(), StartOutcome::Superseded);
    assert!(a.report().is_none());
    assert_eq!(a.start_analysis().await, StartOutcome::NoDocument);
}

#[tokio::test]
async fn dropped_run_releases_the_slot() {
    let gate = Arc::new(Notify::new());
    let svc = Scripted::gated([ok()], gate);
    let a = analyzer(svc);
    a.select_document(pdf());

    let timed = tokio::time::timeout(Duration::from_millis(50), a.start_analysis()).await;
    assert!(timed.is_err());
    assert!(!a.is_analyzing());
    assert_eq!(a.state(), AnalysisState::Idle);
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    phases: Mutex<Vec<AnalysisPhase>>,
    completed: AtomicUsize,
    failures: Mutex<Vec<String>>,
}

impl AnalysisProgressCallback for Recorder {
    fn on_phase(&self, phase: AnalysisPhase, label: &str) {
        assert_eq!(label, phase.label());
        self.phases.lock().unwrap().push(phase);
    }

    fn on_analysis_complete(&self, _report: &EligibilityReport) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_analysis_failed(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

#[tokio::test]
async fn progress_callback_sees_phases_in_order() {
    let rec = Arc::new(Recorder::default());
    let config = AnalysisConfig::builder()
        .progress_callback(Arc::clone(&rec) as Arc<dyn AnalysisProgressCallback>)
        .build()
        .unwrap();
    let svc = Scripted::replying([ok(), Err(ServiceFailure::new("falhou"))]);
    let a = Analyzer::with_service(svc, config);
    a.select_document(pdf());

    a.start_analysis().await;
    assert_eq!(
        *rec.phases.lock().unwrap(),
        vec![
            AnalysisPhase::Normalizing,
            AnalysisPhase::Requesting,
            AnalysisPhase::ParsingResponse
        ]
    );
    assert_eq!(rec.completed.load(Ordering::SeqCst), 1);

    a.start_analysis().await;
    assert_eq!(*rec.failures.lock().unwrap(), vec!["falhou".to_string()]);
}
