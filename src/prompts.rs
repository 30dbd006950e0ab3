//! Instruction prompts for local vision-model recognition.
//!
//! Callers can override the default via
//! [`crate::config::ClientConfig::local_ai_prompt`]; the constant here is used
//! only when no override is provided.

/// Default instruction sent with every local-AI recognition request.
///
/// Asks for a verbatim transcription with the visual layout preserved. The
/// trailing `/no_think` switch disables the reasoning preamble of
/// qwen3-family models; any block that slips through is removed by
/// [`crate::pipeline::postprocess::clean_recognized_text`].
pub const DEFAULT_RECOGNITION_PROMPT: &str = r#"You are a precise OCR engine. Extract ALL text visible in this image.

Rules:
1. Transcribe the text exactly as written. Do not translate, summarise or correct it.
2. Preserve the layout: keep line breaks, paragraph breaks and the reading order
   a human would use. Keep list markers and numbering.
3. Traditional Chinese and English may appear together; keep both scripts as-is.
4. For tables, put each row on its own line and separate cells with " | ".
5. Output ONLY the extracted text. No commentary, no code fences, no headings
   that are not in the image.

/no_think"#;

/// Language pack used by the local OCR engine: Traditional Chinese + English.
pub const DEFAULT_OCR_LANGUAGES: &str = "chi_tra+eng";
