//! # repdf
//!
//! Client-side processing orchestrator for the 94RePdf document service.
//!
//! A session unlocks with a password, stages one PDF or image, shows the
//! server's analysis of it, and then processes it in one of three modes:
//!
//! | Mode | Runs on | Accepts | Produces |
//! |------|---------|---------|----------|
//! | Local AI  | a local Ollama vision model | images | recognised text |
//! | Local OCR | the `tesseract` CLI | images | recognised text + confidence |
//! | Cloud AI  | the 94RePdf server | PDF, images | a downloadable PPTX |
//!
//! ## Session Overview
//!
//! ```text
//! Auth ──▶ Upload ──▶ Analyze ──▶ Progress ──▶ Result
//!  │         │          ▲            │
//!  │         │          └── failure ─┘
//!  │         └─ validate (type, ≤ 50 MiB), upload, analyze (fallback on error)
//!  └─ password check, 7-day cookie
//! ```
//!
//! Intake is best-effort: when upload or analysis fails, a default analysis
//! is substituted so the local modes keep working offline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repdf::{ClientConfig, OcrMode, Orchestrator, ProcessOptions, StagedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .api_base("https://repdf.example.org/api")
//!         .build()?;
//!     let mut session = Orchestrator::new(config)?;
//!
//!     session.start().await;
//!     session.authenticate("secret").await?;
//!     let intake = session.stage_file(StagedFile::from_path("slide.png").await?).await?;
//!     eprintln!("{} pages", intake.analysis.pages);
//!
//!     session.select_mode(OcrMode::LocalOcr)?;
//!     let view = session.process(&ProcessOptions::default()).await?;
//!     println!("{}", view.text().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `repdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! repdf = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clients;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ErrorClass, RepdfError};
pub use orchestrator::{ActionOutcome, Orchestrator};
pub use pipeline::executor::ProcessOptions;
pub use pipeline::input::StagedFile;
pub use pipeline::intake::IntakeOutcome;
pub use pipeline::mode::{Availability, CostDisplay, CostFraming, CostPolicy, ModeSelection};
pub use pipeline::poll::PollPolicy;
pub use pipeline::present::{ResultAction, ResultView};
pub use progress::{
    NoopProgressCallback, Phase, ProcessingProgressCallback, ProgressCallback, ProgressUpdate,
};
pub use session::{
    Analysis, AnalysisSource, ContentType, Feature, FileKind, OcrMode, Orientation, PageSize,
    Screen, SessionState,
};
