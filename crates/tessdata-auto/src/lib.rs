//! # tessdata-auto
//!
//! Locate the [Tesseract](https://github.com/tesseract-ocr/tesseract) binary
//! and auto-download missing language packs at runtime, so that local OCR
//! works without manually copying `.traineddata` files into a system
//! `tessdata` directory.
//!
//! ## How it works
//!
//! On a call to [`ensure_languages`]:
//!
//! 1. If `TESSDATA_PREFIX` points at a directory that already holds every
//!    requested language, that directory is used as-is.
//! 2. Otherwise the per-user cache (`~/.cache/repdf/tessdata_fast/`) is checked.
//! 3. Each missing `{lang}.traineddata` is downloaded from
//!    [tessdata_fast](https://github.com/tesseract-ocr/tessdata_fast) and
//!    written atomically into the cache.
//!
//! Subsequent calls skip the network entirely.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tessdata_auto::{ensure_languages, find_tesseract_binary};
//!
//! let binary = find_tesseract_binary().expect("tesseract not installed");
//! let tessdata = ensure_languages("chi_tra+eng", Some(&|p| {
//!     eprint!("\r{}: {:.0}%", p.language, p.fraction() * 100.0);
//! }))
//! .expect("language download failed");
//! println!("{} --tessdata-dir {}", binary.display(), tessdata.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `TESSERACT_PATH`: path to an existing tesseract executable.
//! - `TESSDATA_PREFIX`: an existing tessdata directory (used when complete).
//! - `TESSDATA_AUTO_CACHE_DIR`: override the default cache directory.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Base URL of the tessdata_fast repository's raw files.
pub const TESSDATA_BASE_URL: &str = "https://github.com/tesseract-ocr/tessdata_fast/raw/main";

/// Cache sub-directory name; bump when the upstream model generation changes.
pub const TESSDATA_FLAVOUR: &str = "tessdata_fast";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by tessdata-auto operations.
#[derive(Error, Debug)]
pub enum TessdataAutoError {
    /// No tesseract executable could be located.
    #[error("tesseract binary not found (searched: {searched})\nInstall tesseract or set TESSERACT_PATH.")]
    BinaryNotFound { searched: String },

    /// The language spec is empty or contains an invalid code.
    #[error("Invalid language spec '{spec}': {reason}")]
    InvalidLanguage { spec: String, reason: String },

    /// Could not create or navigate the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// A downloaded language pack could not be written to disk.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress of a language-pack download.
///
/// `file_index` is 0-based over the languages that actually need
/// downloading, so `fraction()` covers the whole provisioning step.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub language: String,
    pub file_index: usize,
    pub file_count: usize,
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Overall completion in `[0, 1]` across all files of this run.
    pub fn fraction(&self) -> f32 {
        if self.file_count == 0 {
            return 1.0;
        }
        let within = match self.total {
            Some(t) if t > 0 => (self.downloaded as f64 / t as f64).min(1.0),
            _ => 0.0,
        };
        ((self.file_index as f64 + within) / self.file_count as f64) as f32
    }
}

// ── Language specs ───────────────────────────────────────────────────────────

/// Split a tesseract language spec (`"chi_tra+eng"`) into its codes.
pub fn parse_languages(spec: &str) -> Result<Vec<String>, TessdataAutoError> {
    let langs: Vec<String> = spec
        .split('+')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if langs.is_empty() {
        return Err(TessdataAutoError::InvalidLanguage {
            spec: spec.to_string(),
            reason: "no language codes".into(),
        });
    }

    for lang in &langs {
        let valid = lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(TessdataAutoError::InvalidLanguage {
                spec: spec.to_string(),
                reason: format!("'{lang}' contains characters outside [A-Za-z0-9_-]"),
            });
        }
    }

    Ok(langs)
}

/// Languages from `langs` with no `{lang}.traineddata` inside `dir`.
pub fn missing_languages(dir: &Path, langs: &[String]) -> Vec<String> {
    langs
        .iter()
        .filter(|l| !dir.join(format!("{l}.traineddata")).is_file())
        .cloned()
        .collect()
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the cache directory for downloaded language packs.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/repdf/tessdata_fast/`
/// - **Linux**: `~/.cache/repdf/tessdata_fast/`
/// - **Windows**: `%LOCALAPPDATA%\repdf\tessdata_fast\`
///
/// Override by setting `TESSDATA_AUTO_CACHE_DIR`.
pub fn tessdata_cache_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var("TESSDATA_AUTO_CACHE_DIR") {
        return PathBuf::from(override_dir).join(TESSDATA_FLAVOUR);
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("repdf").join(TESSDATA_FLAVOUR)
}

// ── Binary lookup ────────────────────────────────────────────────────────────

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

/// Locate the tesseract executable.
///
/// `TESSERACT_PATH` wins when it points to an existing file; otherwise every
/// `PATH` entry is searched in order.
pub fn find_tesseract_binary() -> Result<PathBuf, TessdataAutoError> {
    let mut searched = Vec::new();

    if let Ok(p) = std::env::var("TESSERACT_PATH") {
        let pb = PathBuf::from(&p);
        if pb.is_file() {
            return Ok(pb);
        }
        searched.push(p);
    }

    if let Some(paths) = std::env::var_os("PATH") {
        if let Some(found) = search_dirs(std::env::split_paths(&paths), binary_name()) {
            return Ok(found);
        }
        searched.push("$PATH".to_string());
    }

    Err(TessdataAutoError::BinaryNotFound {
        searched: searched.join(", "),
    })
}

fn search_dirs(dirs: impl IntoIterator<Item = PathBuf>, name: &str) -> Option<PathBuf> {
    dirs.into_iter()
        .map(|d| d.join(name))
        .find(|candidate| candidate.is_file())
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Ensures every language in `spec` is available and returns the tessdata
/// directory to pass as `--tessdata-dir`.
///
/// `on_progress` receives a [`DownloadProgress`] for every 64 KiB chunk
/// downloaded. Nothing is reported when all languages are already present.
pub fn ensure_languages(
    spec: &str,
    on_progress: Option<&dyn Fn(&DownloadProgress)>,
) -> Result<PathBuf, TessdataAutoError> {
    let langs = parse_languages(spec)?;

    // 1. An existing, complete system tessdata directory.
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(prefix);
        if p.is_dir() && missing_languages(&p, &langs).is_empty() {
            return Ok(p);
        }
    }

    // 2. The per-user cache, downloading whatever is missing.
    let cache_dir = tessdata_cache_dir();
    let missing = missing_languages(&cache_dir, &langs);
    if missing.is_empty() {
        return Ok(cache_dir);
    }

    std::fs::create_dir_all(&cache_dir).map_err(TessdataAutoError::CacheDir)?;

    let file_count = missing.len();
    for (file_index, lang) in missing.iter().enumerate() {
        let url = format!("{TESSDATA_BASE_URL}/{lang}.traineddata");
        let report = |downloaded: u64, total: Option<u64>| {
            if let Some(cb) = on_progress {
                cb(&DownloadProgress {
                    language: lang.clone(),
                    file_index,
                    file_count,
                    downloaded,
                    total,
                });
            }
        };
        let bytes = download_bytes(&url, &report)?;
        write_atomic(&cache_dir.join(format!("{lang}.traineddata")), &bytes)?;
    }

    Ok(cache_dir)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Streams a URL into a `Vec<u8>`, calling `on_progress` every 64 KiB.
fn download_bytes(
    url: &str,
    on_progress: &dyn Fn(u64, Option<u64>),
) -> Result<Vec<u8>, TessdataAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("tessdata-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| TessdataAutoError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| TessdataAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(TessdataAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let capacity = total.unwrap_or(4 * 1024 * 1024) as usize;
    let mut buf = Vec::with_capacity(capacity);

    let mut stream = response;
    let mut chunk = vec![0u8; 64 * 1024];
    let mut downloaded: u64 = 0;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                on_progress(downloaded, total);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(TessdataAutoError::Download(format!("Read error: {e}")));
            }
        }
    }

    Ok(buf)
}

/// Write to `{path}.part` then rename, so a killed download never leaves a
/// truncated `.traineddata` that tesseract would try to load.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TessdataAutoError> {
    let tmp = path.with_extension("traineddata.part");
    std::fs::write(&tmp, bytes).map_err(|source| TessdataAutoError::Write {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| TessdataAutoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mixed_script_spec() {
        let langs = parse_languages("chi_tra+eng").unwrap();
        assert_eq!(langs, vec!["chi_tra".to_string(), "eng".to_string()]);
    }

    #[test]
    fn parse_rejects_empty_and_path_like_specs() {
        assert!(parse_languages("").is_err());
        assert!(parse_languages("+").is_err());
        assert!(parse_languages("../eng").is_err());
    }

    #[test]
    fn missing_languages_checks_traineddata_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"x").unwrap();
        let langs = vec!["chi_tra".to_string(), "eng".to_string()];
        assert_eq!(missing_languages(dir.path(), &langs), vec!["chi_tra"]);
    }

    #[test]
    fn cache_dir_is_deterministic() {
        let d1 = tessdata_cache_dir();
        let d2 = tessdata_cache_dir();
        assert_eq!(d1, d2);
        assert!(d1.to_str().unwrap().contains(TESSDATA_FLAVOUR));
    }

    #[test]
    fn cache_dir_override_via_env() {
        std::env::set_var("TESSDATA_AUTO_CACHE_DIR", "/tmp/test_repdf_override");
        let d = tessdata_cache_dir();
        std::env::remove_var("TESSDATA_AUTO_CACHE_DIR");
        assert!(d.starts_with("/tmp/test_repdf_override"));
    }

    #[test]
    fn search_dirs_finds_first_match() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(b.path().join("tesseract"), b"#!/bin/sh").unwrap();
        let found = search_dirs(
            vec![a.path().to_path_buf(), b.path().to_path_buf()],
            "tesseract",
        );
        assert_eq!(found, Some(b.path().join("tesseract")));
    }

    #[test]
    fn download_fraction_spans_all_files() {
        let p = DownloadProgress {
            language: "eng".into(),
            file_index: 1,
            file_count: 2,
            downloaded: 50,
            total: Some(100),
        };
        assert!((p.fraction() - 0.75).abs() < 1e-6);

        let unknown_total = DownloadProgress { total: None, ..p };
        assert!((unknown_total.fraction() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn write_atomic_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("eng.traineddata");
        write_atomic(&target, b"model").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"model");
        assert!(!dir.path().join("eng.traineddata.part").exists());
    }
}
