//! Local AI: one vision-model call per image through Ollama.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{ExecutionContext, ModeExecutor, ProgressSignal};
use crate::clients::{GenerateOptions, GenerateRequest, InferenceServer};
use crate::config::ClientConfig;
use crate::error::RepdfError;
use crate::pipeline::encode::encode_image;
use crate::pipeline::postprocess::clean_recognized_text;
use crate::pipeline::present::ResultView;
use crate::prompts::DEFAULT_RECOGNITION_PROMPT;
use crate::session::{FileKind, OcrMode};

pub struct LocalAiExecutor {
    server: Arc<dyn InferenceServer>,
    model: String,
    prompt: String,
    temperature: f32,
    /// The model reports no confidence, so a fixed value is shown.
    confidence: u8,
}

impl LocalAiExecutor {
    pub fn new(server: Arc<dyn InferenceServer>, model: impl Into<String>) -> Self {
        Self {
            server,
            model: model.into(),
            prompt: DEFAULT_RECOGNITION_PROMPT.to_string(),
            temperature: 0.1,
            confidence: 95,
        }
    }

    pub fn from_config(server: Arc<dyn InferenceServer>, config: &ClientConfig) -> Self {
        Self {
            server,
            model: config.vision_model.clone(),
            prompt: config
                .local_ai_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_RECOGNITION_PROMPT.to_string()),
            temperature: config.temperature,
            confidence: config.local_ai_confidence,
        }
    }
}

#[async_trait]
impl ModeExecutor for LocalAiExecutor {
    fn mode(&self) -> OcrMode {
        OcrMode::LocalAi
    }

    fn supports(&self, kind: FileKind) -> bool {
        kind == FileKind::Image
    }

    fn map_progress(&self, signal: &ProgressSignal) -> u8 {
        match signal {
            ProgressSignal::Encoding => 10,
            ProgressSignal::Inferring => 30,
            ProgressSignal::Done => 100,
            _ => 0,
        }
    }

    async fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ResultView, RepdfError> {
        ctx.report(self, ProgressSignal::Encoding);
        let encoded = encode_image(ctx.file)?;
        debug!(
            "Encoded {} ({}x{}, {} base64 bytes)",
            ctx.file.name,
            encoded.width,
            encoded.height,
            encoded.base64.len()
        );

        ctx.report(self, ProgressSignal::Inferring);
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            images: vec![encoded.base64],
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };
        let raw = self.server.generate(&request).await?;
        let text = clean_recognized_text(&raw);

        Ok(ResultView::recognized(
            OcrMode::LocalAi,
            ctx.file,
            text,
            f32::from(self.confidence),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unused;

    #[async_trait]
    impl InferenceServer for Unused {
        fn base_url(&self) -> &str {
            "http://localhost:11434"
        }
        async fn list_models(&self) -> Result<Vec<String>, RepdfError> {
            unreachable!()
        }
        async fn generate(&self, _: &GenerateRequest) -> Result<String, RepdfError> {
            unreachable!()
        }
    }

    #[test]
    fn progress_bands() {
        let ex = LocalAiExecutor::new(Arc::new(Unused), "qwen3-vl:8b");
        assert_eq!(ex.map_progress(&ProgressSignal::Init), 0);
        assert_eq!(ex.map_progress(&ProgressSignal::Encoding), 10);
        assert_eq!(ex.map_progress(&ProgressSignal::Inferring), 30);
        assert_eq!(ex.map_progress(&ProgressSignal::Done), 100);
    }

    #[test]
    fn images_only() {
        let ex = LocalAiExecutor::new(Arc::new(Unused), "qwen3-vl:8b");
        assert!(ex.supports(FileKind::Image));
        assert!(!ex.supports(FileKind::Pdf));
    }

    #[test]
    fn from_config_uses_custom_prompt() {
        let config = ClientConfig::builder()
            .local_ai_prompt("Transcribe.")
            .local_ai_confidence(90)
            .build()
            .unwrap();
        let ex = LocalAiExecutor::from_config(Arc::new(Unused), &config);
        assert_eq!(ex.prompt, "Transcribe.");
        assert_eq!(ex.confidence, 90);
        assert_eq!(ex.model, config.vision_model);
    }
}
