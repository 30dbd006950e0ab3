//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use repdf::clients::{
    GenerateRequest, InferenceServer, OcrEngineFactory, OcrProgress, OcrProgressFn,
    OcrRecognition, OcrWorker, PptxRequest, RemoteApi, TaskProgress, TaskStatus,
};
use repdf::pipeline::auth::CookieJar;
use repdf::{
    Analysis, ClientConfig, ClientConfigBuilder, ContentType, OcrMode, Orchestrator,
    Orientation, PageSize, ProcessingProgressCallback, ProgressUpdate, RepdfError, StagedFile,
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub const PASSWORD: &str = "letmein";
pub const MODEL: &str = "qwen3-vl:8b";

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// A real, decodable 2×2 PNG.
pub fn png_file(name: &str) -> StagedFile {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    StagedFile::new(name, "image/png", bytes)
}

pub fn pdf_file(name: &str) -> StagedFile {
    StagedFile::new(
        name,
        "application/pdf",
        b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n".to_vec(),
    )
}

pub fn analysis(pages: u32) -> Analysis {
    Analysis {
        pages,
        original_size: PageSize {
            name: "A4".into(),
            width_mm: 210.0,
            height_mm: 297.0,
        },
        orientation: Orientation::Landscape,
        content_type: ContentType::NativePdf,
    }
}

pub fn status(state: &str, percent: f64) -> TaskStatus {
    TaskStatus {
        status: state.into(),
        progress: Some(TaskProgress {
            percent,
            current_page: None,
            total_pages: None,
            current_step: None,
        }),
        error: None,
    }
}

// ── Remote API ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyBehaviour {
    Accept,
    Reject,
    Unreachable,
}

/// Scripted [`RemoteApi`] that logs every call in order.
pub struct MockApi {
    pub verify: VerifyBehaviour,
    pub upload_fails: bool,
    pub analysis: Option<Analysis>,
    /// `None` entries are transient request failures. When the script runs
    /// out, every further poll answers `pending`.
    pub statuses: Mutex<VecDeque<Option<TaskStatus>>>,
    pub calls: Mutex<Vec<String>>,
    pub status_times: Mutex<Vec<Instant>>,
    pub last_pptx: Mutex<Option<PptxRequest>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            verify: VerifyBehaviour::Accept,
            upload_fails: false,
            analysis: Some(analysis(2)),
            statuses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            status_times: Mutex::new(Vec::new()),
            last_pptx: Mutex::new(None),
        }
    }

    pub fn with_statuses(self, script: Vec<Option<TaskStatus>>) -> Self {
        *self.statuses.lock().unwrap() = script.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn unreachable(endpoint: &str) -> RepdfError {
        RepdfError::Remote {
            endpoint: endpoint.into(),
            reason: "connection refused".into(),
        }
    }
}

#[async_trait]
impl RemoteApi for MockApi {
    async fn verify_password(&self, password: &str) -> Result<bool, RepdfError> {
        self.log("verify");
        match self.verify {
            VerifyBehaviour::Accept => Ok(password == PASSWORD),
            VerifyBehaviour::Reject => Ok(false),
            VerifyBehaviour::Unreachable => Err(RepdfError::AuthUnreachable {
                reason: "connection refused".into(),
            }),
        }
    }

    async fn upload(&self, file: &StagedFile) -> Result<String, RepdfError> {
        self.log("upload");
        if self.upload_fails {
            return Err(Self::unreachable("/upload"));
        }
        assert!(!file.bytes.is_empty());
        Ok("file-1".into())
    }

    async fn analyze(&self, file_id: &str) -> Result<Analysis, RepdfError> {
        self.log(format!("analyze:{file_id}"));
        self.analysis
            .clone()
            .ok_or_else(|| Self::unreachable("/analyze"))
    }

    async fn start_pptx(&self, request: &PptxRequest) -> Result<String, RepdfError> {
        self.log("start_pptx");
        *self.last_pptx.lock().unwrap() = Some(request.clone());
        Ok("task-1234567890".into())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, RepdfError> {
        self.log(format!("status:{task_id}"));
        self.status_times.lock().unwrap().push(Instant::now());
        match self.statuses.lock().unwrap().pop_front() {
            Some(Some(s)) => Ok(s),
            Some(None) => Err(Self::unreachable("/process/status")),
            None => Ok(status("pending", 0.0)),
        }
    }

    async fn download(&self, task_id: &str) -> Result<Vec<u8>, RepdfError> {
        self.log(format!("download:{task_id}"));
        Ok(b"PK\x03\x04pptx".to_vec())
    }

    fn download_url(&self, task_id: &str) -> String {
        format!("http://api.test/api/download/{task_id}")
    }
}

// ── Inference server ─────────────────────────────────────────────────────────

pub struct MockInference {
    pub models: Option<Vec<String>>,
    /// `None` makes generation fail as if the server were down.
    pub response: Option<String>,
    pub generate_calls: AtomicUsize,
    pub last_request: Mutex<Option<GenerateRequest>>,
}

impl MockInference {
    pub fn with_model() -> Self {
        Self {
            models: Some(vec!["llama3:latest".into(), MODEL.into()]),
            response: Some("Hello".into()),
            generate_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn offline() -> Self {
        Self {
            models: None,
            response: None,
            generate_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }
}

#[async_trait]
impl InferenceServer for MockInference {
    fn base_url(&self) -> &str {
        "http://localhost:11434"
    }

    async fn list_models(&self) -> Result<Vec<String>, RepdfError> {
        self.models.clone().ok_or_else(|| RepdfError::InferenceFailed {
            url: self.base_url().into(),
            reason: "connection refused".into(),
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, RepdfError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.response.clone().ok_or_else(|| RepdfError::InferenceFailed {
            url: self.base_url().into(),
            reason: "connection refused".into(),
        })
    }
}

// ── OCR engine ───────────────────────────────────────────────────────────────

/// Factory whose workers replay `events`, then return `recognition` (or fail
/// when it is `None`). Creation and teardown are counted.
pub struct MockOcr {
    pub events: Vec<OcrProgress>,
    pub recognition: Option<OcrRecognition>,
    pub created: AtomicUsize,
    pub terminated: Arc<AtomicUsize>,
}

impl MockOcr {
    pub fn returning(text: &str, confidence: f32) -> Self {
        Self {
            events: Vec::new(),
            recognition: Some(OcrRecognition {
                text: text.into(),
                confidence,
            }),
            created: AtomicUsize::new(0),
            terminated: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            recognition: None,
            ..Self::returning("", 0.0)
        }
    }

    pub fn with_events(mut self, events: Vec<OcrProgress>) -> Self {
        self.events = events;
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

struct MockWorker {
    events: Vec<OcrProgress>,
    recognition: Option<OcrRecognition>,
    on_progress: OcrProgressFn,
    terminated: Arc<AtomicUsize>,
}

#[async_trait]
impl OcrEngineFactory for MockOcr {
    async fn create_worker(
        &self,
        languages: &str,
        on_progress: OcrProgressFn,
    ) -> Result<Box<dyn OcrWorker>, RepdfError> {
        assert_eq!(languages, "chi_tra+eng");
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockWorker {
            events: self.events.clone(),
            recognition: self.recognition.clone(),
            on_progress,
            terminated: Arc::clone(&self.terminated),
        }))
    }
}

#[async_trait]
impl OcrWorker for MockWorker {
    async fn recognize(&mut self, _image: &[u8]) -> Result<OcrRecognition, RepdfError> {
        for e in &self.events {
            (self.on_progress)(*e);
        }
        self.recognition
            .clone()
            .ok_or_else(|| RepdfError::OcrFailed("engine crashed".into()))
    }

    async fn terminate(&mut self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Progress recorder ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Recorder {
    pub updates: Mutex<Vec<ProgressUpdate>>,
    pub started: Mutex<Vec<OcrMode>>,
    pub retries: Mutex<Vec<u32>>,
    pub completed: AtomicUsize,
    pub failed: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn percents(&self) -> Vec<u8> {
        self.updates.lock().unwrap().iter().map(|u| u.percent).collect()
    }
}

impl ProcessingProgressCallback for Recorder {
    fn on_run_start(&self, mode: OcrMode) {
        self.started.lock().unwrap().push(mode);
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    fn on_poll_retry(&self, attempt: u32, _error: &str) {
        self.retries.lock().unwrap().push(attempt);
    }

    fn on_run_complete(&self, _mode: OcrMode) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_run_failed(&self, _mode: OcrMode, error: &str) {
        self.failed.lock().unwrap().push(error.to_string());
    }
}

// ── Logging ──────────────────────────────────────────────────────────────────

/// Route library logs through the test writer; `RUST_LOG=repdf=debug` shows
/// them for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub struct Harness {
    pub api: Arc<MockApi>,
    pub inference: Arc<MockInference>,
    pub ocr: Arc<MockOcr>,
    pub recorder: Arc<Recorder>,
    pub session: Orchestrator,
}

impl Harness {
    pub fn new(api: MockApi, inference: MockInference, ocr: MockOcr) -> Self {
        Self::with_config(api, inference, ocr, |b| b)
    }

    pub fn with_config(
        api: MockApi,
        inference: MockInference,
        ocr: MockOcr,
        configure: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder,
    ) -> Self {
        init_tracing();
        let api = Arc::new(api);
        let inference = Arc::new(inference);
        let ocr = Arc::new(ocr);
        let recorder = Arc::new(Recorder::default());
        let config: ClientConfig = configure(
            ClientConfig::builder()
                .remember_login(false)
                .progress_callback(recorder.clone()),
        )
        .build()
        .unwrap();
        let session = Orchestrator::with_clients(
            config,
            api.clone(),
            inference.clone(),
            ocr.clone(),
            CookieJar::in_memory(),
        );
        Self {
            api,
            inference,
            ocr,
            recorder,
            session,
        }
    }

    /// Run `start()` and sign in.
    pub async fn signed_in(mut self) -> Self {
        self.session.start().await;
        self.session.authenticate(PASSWORD).await.unwrap();
        self
    }
}
