//! Image encoding for local engines and the result view.
//!
//! The staged bytes are probed with the `image` crate before anything is sent
//! to an engine, so a truncated or mislabelled upload fails fast with a clear
//! error instead of an opaque engine response. The original bytes are then
//! base64-wrapped unchanged: both Ollama and the result view accept PNG and
//! JPEG as-is.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageReader;
use std::io::Cursor;
use tracing::debug;

use crate::error::RepdfError;
use crate::pipeline::input::StagedFile;

/// A staged image ready for an inference request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

/// Probe the image header and base64-encode the staged bytes.
pub fn encode_image(file: &StagedFile) -> Result<EncodedImage, RepdfError> {
    let (width, height) = image_dimensions(&file.bytes).map_err(|e| {
        RepdfError::Internal(format!("'{}' is not a readable image: {e}", file.name))
    })?;

    let b64 = STANDARD.encode(&file.bytes);
    debug!("Encoded {}x{} image → {} bytes base64", width, height, b64.len());

    Ok(EncodedImage {
        base64: b64,
        width,
        height,
    })
}

fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), image::ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}

/// `data:` URL for embedding the staged file in an HTML fragment.
pub fn data_url(file: &StagedFile) -> String {
    format!("data:{};base64,{}", file.mime, STANDARD.encode(&file.bytes))
}
