//! Error types for the repdf client.
//!
//! Every failure is scoped to a single user action: nothing here is fatal to
//! the process. Each [`RepdfError`] carries an [`ErrorClass`] that mirrors how
//! the failure is surfaced, and a [`Screen`] naming the safe step the session
//! falls back to.
//!
//! * **Validation**: bad file type or size, empty password. Reported
//!   immediately, never retried.
//! * **Connectivity**: the remote API or a local engine could not be
//!   reached. Blocking for auth; intake degrades to a default analysis
//!   instead of raising one of these.
//! * **Mode constraint**: the staged file cannot be handled by the selected
//!   mode. Carries actionable guidance.
//! * **Remote job**: the server reported `failed`, or polling gave up.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::{FileKind, OcrMode, Screen};

/// Coarse error taxonomy used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad user input. No retry, the user must re-select or re-type.
    Validation,
    /// Password rejected by the server.
    Authentication,
    /// A server or engine could not be reached.
    Connectivity,
    /// The selected mode cannot process the staged file.
    ModeConstraint,
    /// The remote conversion job failed or timed out.
    RemoteJob,
    /// Local setup is wrong (missing binary, invalid config).
    Configuration,
    /// Unexpected internal failure.
    Internal,
}

/// All errors returned by the repdf library.
#[derive(Debug, Error)]
pub enum RepdfError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The password field was empty; nothing was sent.
    #[error("Please enter a password")]
    EmptyPassword,

    /// Only PDF, PNG and JPEG files are accepted.
    #[error("'{name}' has type '{mime}': only PDF, PNG and JPG files are supported")]
    UnsupportedFileType { name: String, mime: String },

    /// The staged file exceeds the upload limit.
    #[error("'{name}' is {size} bytes, over the {limit_mb} MB limit")]
    FileTooLarge { name: String, size: u64, limit_mb: u64 },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Authentication errors ─────────────────────────────────────────────
    /// The server answered, and the password was wrong.
    #[error("Wrong password")]
    WrongPassword,

    /// An action that needs a verified session was attempted without one.
    #[error("Not authenticated: enter the access password first")]
    NotAuthenticated,

    // ── Connectivity errors ───────────────────────────────────────────────
    /// Password verification could not reach the server.
    #[error("Could not reach the authentication server: {reason}\nCheck your internet connection.")]
    AuthUnreachable { reason: String },

    /// A remote API call failed at the transport or HTTP level.
    #[error("Remote API call '{endpoint}' failed: {reason}")]
    Remote { endpoint: String, reason: String },

    /// The local inference server rejected or dropped the request.
    #[error("Local AI recognition failed: {reason}\nMake sure Ollama is running at {url}.")]
    InferenceFailed { url: String, reason: String },

    // ── Mode-constraint errors ────────────────────────────────────────────
    /// The selected mode is not available on this machine.
    #[error("{mode} is not available: {reason}")]
    ModeUnavailable { mode: OcrMode, reason: String },

    /// The selected mode cannot process this kind of file.
    #[error("{mode} only supports image files (PNG/JPG), got a {kind}.\nUse Cloud AI mode for PDF files.")]
    UnsupportedFileKind { mode: OcrMode, kind: FileKind },

    /// Processing was requested before a file was staged.
    #[error("No file staged: choose a PDF or image first")]
    NoFileStaged,

    /// Cloud processing needs a server-side file id, and upload never succeeded.
    #[error("The file was never uploaded to the server, so Cloud AI cannot process it.\nCheck your connection and upload again, or use a local mode.")]
    NotUploaded,

    // ── Local OCR errors ──────────────────────────────────────────────────
    /// The OCR engine failed during initialisation or recognition.
    #[error("Local OCR failed: {0}")]
    OcrFailed(String),

    // ── Remote job errors ─────────────────────────────────────────────────
    /// The server reported `status = failed` for the task.
    #[error("Processing failed{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    TaskFailed {
        task_id: String,
        detail: Option<String>,
    },

    /// Polling exceeded the configured attempt or duration ceiling.
    #[error("Gave up waiting for task {task_id} after {attempts} status requests ({elapsed_secs}s)")]
    PollTimeout {
        task_id: String,
        attempts: u32,
        elapsed_secs: u64,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The local OCR engine could not be provisioned.
    #[error(
        "Failed to set up the local OCR engine: {0}\n\n\
Language data is normally downloaded automatically on first use.\n\
If that failed, you can:\n\
  • Install tesseract and make sure it is on PATH (or set TESSERACT_PATH).\n\
  • Set TESSDATA_PREFIX to a directory containing chi_tra and eng traineddata.\n"
    )]
    EngineSetup(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read or write the persisted cookie file.
    #[error("Cookie store '{path}' is not usable: {source}")]
    CookieStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a downloaded or exported file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepdfError {
    /// Which branch of the error taxonomy this error belongs to.
    pub fn class(&self) -> ErrorClass {
        use RepdfError::*;
        match self {
            EmptyPassword
            | UnsupportedFileType { .. }
            | FileTooLarge { .. }
            | FileNotFound { .. }
            | PermissionDenied { .. } => ErrorClass::Validation,
            WrongPassword | NotAuthenticated => ErrorClass::Authentication,
            AuthUnreachable { .. } | Remote { .. } | InferenceFailed { .. } => {
                ErrorClass::Connectivity
            }
            ModeUnavailable { .. } | UnsupportedFileKind { .. } | NoFileStaged | NotUploaded => {
                ErrorClass::ModeConstraint
            }
            TaskFailed { .. } | PollTimeout { .. } => ErrorClass::RemoteJob,
            InvalidConfig(_) | EngineSetup(_) | CookieStore { .. } => ErrorClass::Configuration,
            OcrFailed(_) | OutputWriteFailed { .. } | Internal(_) => ErrorClass::Internal,
        }
    }

    /// The screen the session returns to after this error.
    ///
    /// Auth failures stay on the password prompt, file validation returns to
    /// the upload step, and everything raised while processing goes back to
    /// the analysis/mode-selection step.
    pub fn return_screen(&self) -> Screen {
        use RepdfError::*;
        match self {
            EmptyPassword | WrongPassword | NotAuthenticated | AuthUnreachable { .. } => {
                Screen::Auth
            }
            UnsupportedFileType { .. }
            | FileTooLarge { .. }
            | FileNotFound { .. }
            | PermissionDenied { .. }
            | NoFileStaged => Screen::Upload,
            _ => Screen::Analyze,
        }
    }
}
