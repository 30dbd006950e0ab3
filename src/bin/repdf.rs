//! CLI binary for repdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, walks one session from auth to result, and writes the
//! outputs.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use repdf::{
    ActionOutcome, AnalysisSource, ClientConfig, Feature, OcrMode, Orchestrator,
    ProcessOptions, ProcessingProgressCallback, ProgressCallback, ProgressUpdate, ResultAction,
    ResultView, StagedFile,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one percentage bar per run, with poll retries
/// logged above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_run_start(&self, mode: OcrMode) {
        self.bar.set_prefix(mode.label());
        self.bar.set_position(0);
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        self.bar.set_position(u64::from(update.percent));
        let pages = match (update.current_page, update.total_pages) {
            (Some(c), Some(t)) => format!("  {}", dim(&format!("page {c}/{t}"))),
            _ => String::new(),
        };
        self.bar.set_message(format!("{}{}", update.status_text(), pages));
    }

    fn on_poll_retry(&self, attempt: u32, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} status poll {} failed, retrying  {}",
            cyan("⚠"),
            attempt,
            dim(&msg)
        ));
    }

    fn on_run_complete(&self, mode: OcrMode) {
        self.bar.finish_and_clear();
        eprintln!("{} {} finished", green("✔"), bold(mode.label()));
    }

    fn on_run_failed(&self, mode: OcrMode, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {} failed: {}", red("✘"), bold(mode.label()), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Recognise text in an image with the local OCR engine
  repdf --password secret slide.png

  # Use the local vision model (requires Ollama with qwen3-vl:8b)
  repdf --mode local-ai slide.png --text-out slide.txt

  # Convert a PDF to PPTX on the server, saving into ./out
  repdf --mode cloud-ai --remove-watermark deck.pdf --save-dir out

  # Show the server's analysis only
  repdf --analyze-only deck.pdf

MODES:
  Mode       Accepts       Cost
  ─────────  ────────────  ─────────────────────────────
  local-ai   PNG, JPEG     free
  local-ocr  PNG, JPEG     free
  cloud-ai   PDF, images   US$0.0004 per page (free below 1500 pages/day)

ENVIRONMENT VARIABLES:
  REPDF_PASSWORD          Access password
  REPDF_API_BASE          Remote API root (default http://localhost:8000/api)
  REPDF_OLLAMA_URL        Ollama root (default http://localhost:11434)
  REPDF_MODEL             Vision model for local AI (default qwen3-vl:8b)
  TESSERACT_PATH          Path to the tesseract executable
  TESSDATA_PREFIX         Directory with .traineddata files, skips download
  TESSDATA_AUTO_CACHE_DIR Override the language-data cache directory

SETUP:
  Local OCR needs the `tesseract` executable on PATH. Language data
  (chi_tra, eng) is downloaded automatically on first use and cached in
  ~/.cache/repdf/tessdata_fast/.
"#;

/// Process PDFs and images with 94RePdf: local AI, local OCR or cloud AI.
#[derive(Parser, Debug)]
#[command(
    name = "repdf",
    version,
    about = "Process PDFs and images with 94RePdf: local AI, local OCR or cloud AI",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF, PNG or JPEG file to process.
    file: PathBuf,

    /// Access password. Not needed while a saved login is valid.
    #[arg(long, env = "REPDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Processing mode. Default: local-ai when available, else local-ocr.
    #[arg(long, env = "REPDF_MODE", value_enum)]
    mode: Option<ModeArg>,

    /// Conversion feature: pptx, quick-edit, image, rotate, resize, page-number.
    #[arg(long, env = "REPDF_FEATURE", default_value = "pptx")]
    feature: Feature,

    /// Slide aspect ratio for cloud conversion.
    #[arg(long, env = "REPDF_OUTPUT_RATIO", default_value = "16:9")]
    output_ratio: String,

    /// Ask the server to remove watermarks.
    #[arg(long, env = "REPDF_REMOVE_WATERMARK")]
    remove_watermark: bool,

    /// Directory for downloads. The PPTX always lands here (default: .);
    /// the staged image or original is also saved when this is set.
    #[arg(long, env = "REPDF_SAVE_DIR")]
    save_dir: Option<PathBuf>,

    /// Write the result view as an HTML fragment.
    #[arg(long, env = "REPDF_HTML")]
    html: Option<PathBuf>,

    /// Write recognised text to this file instead of stdout.
    #[arg(long, env = "REPDF_TEXT_OUT")]
    text_out: Option<PathBuf>,

    /// Stop after upload and analysis.
    #[arg(long)]
    analyze_only: bool,

    /// Give up on a cloud job after this many status polls.
    #[arg(long, env = "REPDF_MAX_POLL_ATTEMPTS")]
    max_poll_attempts: Option<u32>,

    /// Give up on a cloud job after this many seconds.
    #[arg(long, env = "REPDF_MAX_POLL_SECS")]
    max_poll_secs: Option<u64>,

    /// Remote API root.
    #[arg(long, env = "REPDF_API_BASE")]
    api_base: Option<String>,

    /// Ollama server root.
    #[arg(long, env = "REPDF_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Vision model for local AI.
    #[arg(long, env = "REPDF_MODEL")]
    model: Option<String>,

    /// Tesseract language spec, e.g. chi_tra+eng.
    #[arg(long, env = "REPDF_OCR_LANGUAGES")]
    ocr_languages: Option<String>,

    /// Do not remember the login between runs.
    #[arg(long, env = "REPDF_NO_REMEMBER")]
    no_remember: bool,

    /// Disable progress bar.
    #[arg(long, env = "REPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "REPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "REPDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    LocalAi,
    LocalOcr,
    CloudAi,
}

impl From<ModeArg> for OcrMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::LocalAi => OcrMode::LocalAi,
            ModeArg::LocalOcr => OcrMode::LocalOcr,
            ModeArg::CloudAi => OcrMode::CloudAi,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would interleave with the bar; the bar is enough.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ProcessingProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let mut session = Orchestrator::new(config).context("Failed to initialise client")?;

    // ── Auth gate ────────────────────────────────────────────────────────
    let availability = session.start().await;
    if !cli.quiet {
        if let Some(reason) = &availability.reason {
            eprintln!("{} Local AI unavailable: {}", dim("·"), dim(reason));
        }
    }
    if !session.session().authenticated {
        let password = cli
            .password
            .as_deref()
            .context("Not signed in: pass --password or set REPDF_PASSWORD")?;
        session
            .authenticate(password)
            .await
            .context("Authentication failed")?;
    }

    // ── Intake ───────────────────────────────────────────────────────────
    let title = session.choose_feature(cli.feature)?;
    let file = StagedFile::from_path(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let size = file.size();
    let name = file.name.clone();
    let intake = session
        .stage_file(file)
        .await
        .context("File rejected")?;

    if !cli.quiet {
        let a = &intake.analysis;
        eprintln!("{} {}", cyan("◆"), bold(title));
        eprintln!("  File:         {}", name);
        eprintln!("  Pages:        {}", a.file_meta_line(size));
        eprintln!("  Page size:    {}", a.size_line());
        eprintln!("  Orientation:  {}", a.orientation.label());
        eprintln!("  Content:      {}", a.content_type.label());
        if let AnalysisSource::Fallback { reason } = &intake.source {
            eprintln!(
                "  {} No analysis available, proceeding with defaults  {}",
                cyan("⚠"),
                dim(reason)
            );
        }
    }
    if cli.analyze_only {
        return Ok(());
    }

    // ── Mode selection ───────────────────────────────────────────────────
    let mode = cli
        .mode
        .map(OcrMode::from)
        .unwrap_or(session.session().ocr_mode);
    let selection = session.select_mode(mode).context("Mode not available")?;
    if !cli.quiet {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold(selection.mode.label()),
            selection.cost.line()
        );
        eprintln!("  {}", dim(selection.hint));
    }

    // ── Processing ───────────────────────────────────────────────────────
    let options = ProcessOptions {
        output_ratio: cli.output_ratio.clone(),
        remove_watermark: cli.remove_watermark,
    };
    let view = session
        .process(&options)
        .await
        .with_context(|| format!("{} processing failed", mode.label()))?;

    if let Some(ref path) = cli.html {
        tokio::fs::write(path, view.render_html())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    // ── Result actions ───────────────────────────────────────────────────
    let default_dir = PathBuf::from(".");
    for action in view.actions() {
        let dest = match (&action, &cli.save_dir) {
            (ResultAction::DownloadArtifact { .. }, dir) => dir.as_ref().unwrap_or(&default_dir),
            (ResultAction::CopyText { .. }, _) => &default_dir,
            (_, Some(dir)) => dir,
            (_, None) => continue,
        };
        let outcome = session
            .perform(&action, dest)
            .await
            .with_context(|| format!("{} failed", action.label()))?;
        report(&cli, &view, &action, outcome)?;
    }

    Ok(())
}

/// Print or write one action's outcome.
fn report(cli: &Cli, view: &ResultView, action: &ResultAction, outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Copied { text } => {
            if let Some(ref path) = cli.text_out {
                std::fs::write(path, &text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                announce(cli, action, path);
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
            if !cli.quiet {
                if let Some(conf) = view.confidence_text() {
                    eprintln!("  Confidence:   {}", bold(&conf));
                }
            }
        }
        ActionOutcome::Saved { path } => announce(cli, action, &path),
    }
    Ok(())
}

fn announce(cli: &Cli, action: &ResultAction, path: &Path) {
    if !cli.quiet {
        eprintln!(
            "{} {}  →  {}",
            green(action.ack_label()),
            action.label(),
            bold(&path.display().to_string())
        );
    }
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().remember_login(!cli.no_remember);

    if let Some(ref url) = cli.api_base {
        builder = builder.api_base(url);
    }
    if let Some(ref url) = cli.ollama_url {
        builder = builder.ollama_url(url);
    }
    if let Some(ref model) = cli.model {
        builder = builder.vision_model(model);
    }
    if let Some(ref langs) = cli.ocr_languages {
        builder = builder.ocr_languages(langs);
    }
    if let Some(n) = cli.max_poll_attempts {
        builder = builder.max_poll_attempts(n);
    }
    if let Some(secs) = cli.max_poll_secs {
        builder = builder.max_poll_duration(Duration::from_secs(secs));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
