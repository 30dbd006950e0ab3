//! Input staging: turn a user-selected file into a validated [`StagedFile`].
//!
//! The MIME type is sniffed from magic bytes (`%PDF`, PNG signature, JPEG
//! SOI marker) and falls back to the file extension, the way a browser file
//! picker reports `File.type`. Validation runs in a fixed order, type first
//! and size second, and always before any network call.

use crate::error::RepdfError;
use crate::session::FileKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// MIME types accepted by intake.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["application/pdf", "image/png", "image/jpeg"];

/// Upload size limit: 50 MiB.
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = b"\xFF\xD8\xFF";

/// A file held client-side for the duration of a processing run.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a local file, sniffing its MIME type.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, RepdfError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => RepdfError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => RepdfError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = file_name(path);
        let mime = sniff_mime(&bytes, &name);
        debug!("Staged {} ({}, {} bytes)", name, mime, bytes.len());
        Ok(Self::new(name, mime, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `None` when the MIME type is not one intake accepts.
    pub fn kind(&self) -> Option<FileKind> {
        match self.mime.as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            "image/png" | "image/jpeg" => Some(FileKind::Image),
            _ => None,
        }
    }

    /// Check type, then size. Returns the file kind on success.
    pub fn validate(&self, max_bytes: u64) -> Result<FileKind, RepdfError> {
        let kind = self.kind().ok_or_else(|| RepdfError::UnsupportedFileType {
            name: self.name.clone(),
            mime: self.mime.clone(),
        })?;

        if self.size() > max_bytes {
            return Err(RepdfError::FileTooLarge {
                name: self.name.clone(),
                size: self.size(),
                limit_mb: max_bytes / (1024 * 1024),
            });
        }

        Ok(kind)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

/// Guess the MIME type from content, then from the file extension.
pub fn sniff_mime(bytes: &[u8], name: &str) -> String {
    if bytes.starts_with(b"%PDF") {
        return "application/pdf".into();
    }
    if bytes.starts_with(PNG_SIGNATURE) {
        return "image/png".into();
    }
    if bytes.starts_with(JPEG_SOI) {
        return "image/jpeg".into();
    }
    mime_from_extension(name).into()
}

fn mime_from_extension(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_prefers_magic_bytes() {
        assert_eq!(sniff_mime(b"%PDF-1.7\n", "scan.png"), "application/pdf");
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n....", "x.bin"), "image/png");
        assert_eq!(sniff_mime(b"\xFF\xD8\xFF\xE0", "photo"), "image/jpeg");
    }

    #[test]
    fn sniff_falls_back_to_extension() {
        assert_eq!(sniff_mime(b"", "Slide.JPG"), "image/jpeg");
        assert_eq!(sniff_mime(b"hello", "notes.txt"), "text/plain");
        assert_eq!(sniff_mime(b"hello", "noext"), "application/octet-stream");
    }

    #[test]
    fn validate_rejects_type_before_size() {
        let huge_text = StagedFile::new("a.txt", "text/plain", vec![0; 10]);
        let err = huge_text.validate(1).unwrap_err();
        assert!(matches!(err, RepdfError::UnsupportedFileType { .. }));
    }

    #[test]
    fn validate_size_limit_is_inclusive() {
        let at_limit = StagedFile::new("a.png", "image/png", vec![0; 16]);
        assert_eq!(at_limit.validate(16).unwrap(), FileKind::Image);

        let over = StagedFile::new("a.pdf", "application/pdf", vec![0; 17]);
        assert!(matches!(
            over.validate(16),
            Err(RepdfError::FileTooLarge { size: 17, .. })
        ));
    }

    #[tokio::test]
    async fn from_path_reads_and_sniffs() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("page.bin");
        std::fs::write(&p, b"%PDF-1.4 body").unwrap();

        let f = StagedFile::from_path(&p).await.unwrap();
        assert_eq!(f.name, "page.bin");
        assert_eq!(f.kind(), Some(FileKind::Pdf));
        assert_eq!(f.size(), 13);
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = StagedFile::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, RepdfError::FileNotFound { .. }));
    }
}
