//! Local OCR engine contract and its Tesseract implementation.
//!
//! The engine follows a worker lifecycle: a factory creates a worker for a
//! language pack (loading language data, reporting progress), the worker
//! recognises one or more images, and [`OcrWorker::terminate`] releases
//! everything it holds. Callers must terminate on success and on failure.
//!
//! [`TesseractEngine`] runs the `tesseract` CLI with TSV output so that
//! per-word confidences can be averaged into a page confidence. Language
//! data is found or downloaded by [`tessdata_auto`] on the blocking pool.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::RepdfError;

/// What the engine is doing when it reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStatus {
    /// Locating or downloading language data.
    LoadingLanguage,
    /// Starting the engine with the loaded languages.
    Initializing,
    Recognizing,
}

/// Engine progress: `progress` is in `[0, 1]` within the current status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrProgress {
    pub status: OcrStatus,
    pub progress: f32,
}

/// Progress sink handed to the engine for the lifetime of a worker.
pub type OcrProgressFn = Arc<dyn Fn(OcrProgress) + Send + Sync>;

/// Recognised text plus the engine's confidence (0–100).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrRecognition {
    pub text: String,
    pub confidence: f32,
}

/// Creates OCR workers.
#[async_trait]
pub trait OcrEngineFactory: Send + Sync {
    /// Create a worker for `languages` (tesseract syntax, `chi_tra+eng`).
    async fn create_worker(
        &self,
        languages: &str,
        on_progress: OcrProgressFn,
    ) -> Result<Box<dyn OcrWorker>, RepdfError>;
}

/// A live OCR engine instance.
#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, image: &[u8]) -> Result<OcrRecognition, RepdfError>;

    /// Release all engine resources. Safe to call more than once.
    async fn terminate(&mut self);
}

// ── Tesseract ────────────────────────────────────────────────────────────

/// [`OcrEngineFactory`] that drives the `tesseract` executable.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    binary: Option<PathBuf>,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractEngine {
    /// `binary` and `tessdata_dir` are discovered automatically when `None`.
    pub fn new(binary: Option<PathBuf>, tessdata_dir: Option<PathBuf>) -> Self {
        Self {
            binary,
            tessdata_dir,
        }
    }
}

#[async_trait]
impl OcrEngineFactory for TesseractEngine {
    async fn create_worker(
        &self,
        languages: &str,
        on_progress: OcrProgressFn,
    ) -> Result<Box<dyn OcrWorker>, RepdfError> {
        let binary = match &self.binary {
            Some(b) => b.clone(),
            None => tessdata_auto::find_tesseract_binary()
                .map_err(|e| RepdfError::EngineSetup(e.to_string()))?,
        };

        on_progress(OcrProgress {
            status: OcrStatus::LoadingLanguage,
            progress: 0.0,
        });

        let tessdata_dir = match &self.tessdata_dir {
            Some(d) => d.clone(),
            None => {
                let spec = languages.to_string();
                let cb = on_progress.clone();
                tokio::task::spawn_blocking(move || {
                    tessdata_auto::ensure_languages(
                        &spec,
                        Some(&|p: &tessdata_auto::DownloadProgress| {
                            cb(OcrProgress {
                                status: OcrStatus::LoadingLanguage,
                                progress: p.fraction(),
                            })
                        }),
                    )
                })
                .await
                .map_err(|e| RepdfError::Internal(format!("language loader panicked: {e}")))?
                .map_err(|e| RepdfError::EngineSetup(e.to_string()))?
            }
        };

        on_progress(OcrProgress {
            status: OcrStatus::Initializing,
            progress: 1.0,
        });

        let workdir = TempDir::new()
            .map_err(|e| RepdfError::Internal(format!("OCR scratch dir: {e}")))?;

        info!(
            "Tesseract worker ready: {} ({}), tessdata {}",
            binary.display(),
            languages,
            tessdata_dir.display()
        );

        Ok(Box::new(TesseractWorker {
            binary,
            tessdata_dir,
            languages: languages.to_string(),
            workdir: Some(workdir),
            on_progress,
        }))
    }
}

struct TesseractWorker {
    binary: PathBuf,
    tessdata_dir: PathBuf,
    languages: String,
    /// Scratch directory for the input image; `None` once terminated.
    workdir: Option<TempDir>,
    on_progress: OcrProgressFn,
}

impl TesseractWorker {
    fn report(&self, progress: f32) {
        (self.on_progress)(OcrProgress {
            status: OcrStatus::Recognizing,
            progress,
        });
    }
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &[u8]) -> Result<OcrRecognition, RepdfError> {
        let workdir = self
            .workdir
            .as_ref()
            .ok_or_else(|| RepdfError::OcrFailed("worker already terminated".into()))?;

        self.report(0.0);
        let input = workdir.path().join("page.img");
        tokio::fs::write(&input, image)
            .await
            .map_err(|e| RepdfError::OcrFailed(format!("writing scratch image: {e}")))?;

        let output = run_tesseract(&self.binary, &input, &self.languages, &self.tessdata_dir).await?;
        self.report(0.9);

        let recognition = parse_tsv(&output);
        debug!(
            "Tesseract: {} chars, confidence {:.1}",
            recognition.text.chars().count(),
            recognition.confidence
        );
        self.report(1.0);
        Ok(recognition)
    }

    async fn terminate(&mut self) {
        if let Some(dir) = self.workdir.take() {
            if let Err(e) = dir.close() {
                warn!("Failed to remove OCR scratch dir: {}", e);
            }
        }
    }
}

async fn run_tesseract(
    binary: &Path,
    input: &Path,
    languages: &str,
    tessdata_dir: &Path,
) -> Result<String, RepdfError> {
    let output = Command::new(binary)
        .arg(input)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--tessdata-dir")
        .arg(tessdata_dir)
        .arg("tsv")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RepdfError::OcrFailed(format!("could not run {}: {e}", binary.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RepdfError::OcrFailed(format!(
            "tesseract exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Assemble text and mean word confidence from tesseract TSV output.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. Only level-5 (word) rows carry text. Words on
/// the same line are joined with spaces, lines with `\n`, and a blank line
/// separates paragraphs.
pub fn parse_tsv(tsv: &str) -> OcrRecognition {
    let mut text = String::new();
    let mut conf_sum = 0.0f64;
    let mut conf_count = 0usize;
    let mut last_line: Option<(u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let key: (u32, u32, u32) = (
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );

        match last_line {
            None => {}
            Some(prev) if prev == key => text.push(' '),
            Some((block, par, _)) if (block, par) == (key.0, key.1) => text.push('\n'),
            Some(_) => text.push_str("\n\n"),
        }
        text.push_str(word);
        last_line = Some(key);

        if let Ok(conf) = cols[10].trim().parse::<f64>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let confidence = if conf_count == 0 {
        0.0
    } else {
        (conf_sum / conf_count as f64) as f32
    };

    OcrRecognition { text, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, par: u32, line: u32, n: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t{block}\t{par}\t{line}\t{n}\t0\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn parse_tsv_groups_words_lines_and_paragraphs() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, 1, 1, "90", "Hello"),
            word(1, 1, 1, 2, "80", "world"),
            word(1, 1, 2, 1, "70", "second"),
            word(2, 1, 1, 1, "100", "新段落"),
        ]
        .join("\n");

        let r = parse_tsv(&tsv);
        assert_eq!(r.text, "Hello world\nsecond\n\n新段落");
        assert!((r.confidence - 85.0).abs() < 1e-4);
    }

    #[test]
    fn parse_tsv_ignores_negative_confidence_and_blank_words() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 1, "-1", "   "),
            word(1, 1, 1, 2, "60", "ok"),
        ]
        .join("\n");
        let r = parse_tsv(&tsv);
        assert_eq!(r.text, "ok");
        assert!((r.confidence - 60.0).abs() < 1e-4);
    }

    #[test]
    fn parse_tsv_empty_output() {
        let r = parse_tsv(HEADER);
        assert_eq!(r.text, "");
        assert_eq!(r.confidence, 0.0);
    }

    #[tokio::test]
    async fn terminate_is_idempotent_and_removes_scratch_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        let mut worker = TesseractWorker {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: PathBuf::from("/nonexistent"),
            languages: "eng".into(),
            workdir: Some(dir),
            on_progress: Arc::new(|_: OcrProgress| {}),
        };
        worker.terminate().await;
        worker.terminate().await;
        assert!(!path.exists());

        let err = worker.recognize(b"img").await.unwrap_err();
        assert!(matches!(err, RepdfError::OcrFailed(_)));
    }
}
