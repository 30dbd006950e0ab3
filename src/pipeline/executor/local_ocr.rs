//! Local OCR: a short-lived tesseract worker per run.
//!
//! The worker is always terminated, whether recognition succeeded or not.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{ExecutionContext, ModeExecutor, ProgressSignal};
use crate::clients::{OcrEngineFactory, OcrProgress, OcrProgressFn, OcrStatus};
use crate::error::RepdfError;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::present::ResultView;
use crate::prompts::DEFAULT_OCR_LANGUAGES;
use crate::session::{FileKind, OcrMode};

pub struct LocalOcrExecutor {
    factory: Arc<dyn OcrEngineFactory>,
    languages: String,
}

impl LocalOcrExecutor {
    pub fn new(factory: Arc<dyn OcrEngineFactory>) -> Self {
        Self::with_languages(factory, DEFAULT_OCR_LANGUAGES)
    }

    pub fn with_languages(factory: Arc<dyn OcrEngineFactory>, languages: impl Into<String>) -> Self {
        Self {
            factory,
            languages: languages.into(),
        }
    }
}

/// Loading fills 0–20, recognition 20–90.
fn engine_percent(p: OcrProgress) -> u8 {
    let fraction = if p.progress.is_nan() {
        0.0
    } else {
        p.progress.clamp(0.0, 1.0)
    };
    let percent = match p.status {
        OcrStatus::LoadingLanguage | OcrStatus::Initializing => fraction * 20.0,
        OcrStatus::Recognizing => 20.0 + fraction * 70.0,
    };
    percent.round() as u8
}

#[async_trait]
impl ModeExecutor for LocalOcrExecutor {
    fn mode(&self) -> OcrMode {
        OcrMode::LocalOcr
    }

    fn supports(&self, kind: FileKind) -> bool {
        kind == FileKind::Image
    }

    fn map_progress(&self, signal: &ProgressSignal) -> u8 {
        match signal {
            ProgressSignal::Engine(p) => engine_percent(*p),
            ProgressSignal::Done => 100,
            _ => 0,
        }
    }

    async fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ResultView, RepdfError> {
        let reporter = ctx.reporter.clone();
        let on_progress: OcrProgressFn = Arc::new(move |p: OcrProgress| {
            reporter.emit(engine_percent(p), &ProgressSignal::Engine(p));
        });

        let mut worker = self
            .factory
            .create_worker(&self.languages, on_progress)
            .await?;
        let outcome = worker.recognize(&ctx.file.bytes).await;
        worker.terminate().await;
        let recognition = outcome?;

        debug!(
            "Recognised {} chars at {:.1}% confidence",
            recognition.text.len(),
            recognition.confidence
        );
        Ok(ResultView::recognized(
            OcrMode::LocalOcr,
            ctx.file,
            clean_ocr_text(&recognition.text),
            recognition.confidence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(status: OcrStatus, progress: f32) -> u8 {
        engine_percent(OcrProgress { status, progress })
    }

    #[test]
    fn loading_band() {
        assert_eq!(at(OcrStatus::LoadingLanguage, 0.0), 0);
        assert_eq!(at(OcrStatus::LoadingLanguage, 0.5), 10);
        assert_eq!(at(OcrStatus::Initializing, 1.0), 20);
    }

    #[test]
    fn recognizing_band() {
        assert_eq!(at(OcrStatus::Recognizing, 0.0), 20);
        assert_eq!(at(OcrStatus::Recognizing, 0.5), 55);
        assert_eq!(at(OcrStatus::Recognizing, 1.0), 90);
    }

    #[test]
    fn out_of_range_engine_values_are_clamped() {
        assert_eq!(at(OcrStatus::Recognizing, 7.0), 90);
        assert_eq!(at(OcrStatus::Recognizing, -1.0), 20);
        assert_eq!(at(OcrStatus::LoadingLanguage, f32::NAN), 0);
    }
}
