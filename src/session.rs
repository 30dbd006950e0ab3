//! Session state shared by every step of one processing run.
//!
//! [`SessionState`] is an explicit context object owned by the
//! [`crate::Orchestrator`]; components receive `&mut SessionState` instead of
//! reaching for ambient globals. It lives for one client session and is never
//! persisted, apart from the auth cookie kept by
//! [`crate::pipeline::auth::CookieJar`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pipeline::input::StagedFile;

// ── Screens ──────────────────────────────────────────────────────────────

/// The step of the flow the user is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    /// Password prompt.
    #[default]
    Auth,
    /// Feature chosen, waiting for a file.
    Upload,
    /// File staged; analysis shown and a mode can be picked.
    Analyze,
    /// A mode executor is running.
    Progress,
    /// Recognised text or a generated artifact is shown.
    Result,
}

// ── Features ─────────────────────────────────────────────────────────────

/// Conversion feature picked before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    Pptx,
    QuickEdit,
    Image,
    Rotate,
    Resize,
    PageNumber,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Pptx,
        Feature::QuickEdit,
        Feature::Image,
        Feature::Rotate,
        Feature::Resize,
        Feature::PageNumber,
    ];

    /// Wire/CLI identifier, e.g. `"quick-edit"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Pptx => "pptx",
            Feature::QuickEdit => "quick-edit",
            Feature::Image => "image",
            Feature::Rotate => "rotate",
            Feature::Resize => "resize",
            Feature::PageNumber => "page-number",
        }
    }

    /// Heading shown on the upload step for this feature.
    pub fn upload_title(self) -> &'static str {
        match self {
            Feature::Pptx => "Upload a PDF to convert to PPTX",
            Feature::QuickEdit => "Upload a file for quick editing",
            Feature::Image => "Upload a PDF to convert to images",
            Feature::Rotate => "Upload a PDF to rotate",
            Feature::Resize => "Upload a PDF to resize",
            Feature::PageNumber => "Upload a PDF to add page numbers",
        }
    }
}

/// Upload heading when no feature was chosen.
pub const DEFAULT_UPLOAD_TITLE: &str = "Upload a file";

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown feature '{s}'"))
    }
}

// ── Processing modes ─────────────────────────────────────────────────────

/// The three mutually exclusive processing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrMode {
    /// Vision model served by a local Ollama instance.
    LocalAi,
    /// Tesseract running on this machine.
    LocalOcr,
    /// The remote API's hosted pipeline.
    CloudAi,
}

impl OcrMode {
    pub fn label(self) -> &'static str {
        match self {
            OcrMode::LocalAi => "Local AI",
            OcrMode::LocalOcr => "Local OCR",
            OcrMode::CloudAi => "Cloud AI",
        }
    }

    /// Local modes run entirely on this machine and never need a `fileId`.
    pub fn is_local(self) -> bool {
        !matches!(self, OcrMode::CloudAi)
    }
}

impl fmt::Display for OcrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse file kind, used to check mode capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => f.write_str("PDF file"),
            FileKind::Image => f.write_str("image"),
        }
    }
}

// ── Analysis ─────────────────────────────────────────────────────────────

/// Detected physical page size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn label(self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

/// What the document is made of. Unknown server values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    /// PDF with a text layer.
    NativePdf,
    /// Scanned/rasterised pages; needs recognition.
    ImagePdf,
    Mixed,
    Other(String),
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "native_pdf" => ContentType::NativePdf,
            "image_pdf" => ContentType::ImagePdf,
            "mixed" => ContentType::Mixed,
            _ => ContentType::Other(s),
        }
    }
}

impl From<ContentType> for String {
    fn from(c: ContentType) -> Self {
        match c {
            ContentType::NativePdf => "native_pdf".into(),
            ContentType::ImagePdf => "image_pdf".into(),
            ContentType::Mixed => "mixed".into(),
            ContentType::Other(s) => s,
        }
    }
}

impl ContentType {
    pub fn label(&self) -> &str {
        match self {
            ContentType::NativePdf => "Native PDF (has a text layer)",
            ContentType::ImagePdf => "Image PDF (needs AI recognition)",
            ContentType::Mixed => "Mixed PDF",
            ContentType::Other(s) => s,
        }
    }
}

/// Structural summary of the staged document, as returned by `/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub pages: u32,
    pub original_size: PageSize,
    pub orientation: Orientation,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl Analysis {
    /// Default used when upload or analysis fails: one portrait image page
    /// of unknown size, so local modes stay usable offline.
    pub fn fallback() -> Self {
        Self {
            pages: 1,
            original_size: PageSize {
                name: "Unknown".into(),
                width_mm: 0.0,
                height_mm: 0.0,
            },
            orientation: Orientation::Portrait,
            content_type: ContentType::ImagePdf,
        }
    }

    /// `"{pages} pages · {size}"` line shown under the file name.
    pub fn file_meta_line(&self, file_size: u64) -> String {
        format!("{} pages · {}", self.pages, format_size(file_size))
    }

    /// `"B4 (257 × 364 mm)"`.
    pub fn size_line(&self) -> String {
        format!(
            "{} ({} × {} mm)",
            self.original_size.name,
            format_mm(self.original_size.width_mm),
            format_mm(self.original_size.height_mm)
        )
    }
}

/// Where the session's analysis came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisSource {
    /// Produced by the remote API.
    Remote,
    /// Synthesised locally because upload or analysis failed.
    Fallback { reason: String },
}

impl AnalysisSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AnalysisSource::Fallback { .. })
    }
}

/// Human-readable byte count: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

fn format_mm(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ── Session state ────────────────────────────────────────────────────────

/// Mutable record shared by the auth gate, intake, mode selector and
/// executors.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// True only after a successful password check (or a valid cookie).
    pub authenticated: bool,
    pub current_feature: Option<Feature>,
    /// Set by a successful upload; cleared when a new file is staged.
    pub file_id: Option<String>,
    /// Set only by the cloud executor once the server accepted a job.
    pub task_id: Option<String>,
    pub analysis: Option<Analysis>,
    pub analysis_source: Option<AnalysisSource>,
    /// Exactly one mode is active at a time.
    pub ocr_mode: OcrMode,
    /// Kept even when upload fails; local modes read it directly.
    pub uploaded_file: Option<StagedFile>,
    pub ollama_available: bool,
    pub screen: Screen,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            authenticated: false,
            current_feature: None,
            file_id: None,
            task_id: None,
            analysis: None,
            analysis_source: None,
            ocr_mode: OcrMode::LocalOcr,
            uploaded_file: None,
            ollama_available: false,
            screen: Screen::Auth,
        }
    }
}

impl SessionState {
    /// Heading for the upload step.
    pub fn upload_title(&self) -> &'static str {
        self.current_feature
            .map(Feature::upload_title)
            .unwrap_or(DEFAULT_UPLOAD_TITLE)
    }

    /// Page count used for cost display; 1 until an analysis exists.
    pub fn pages(&self) -> u32 {
        self.analysis.as_ref().map(|a| a.pages).unwrap_or(1)
    }
}
