//! External collaborators behind async trait seams.
//!
//! Each trait has one production implementation that talks to the real
//! service and is replaced by an in-memory mock in tests:
//!
//! | Trait | Production | Talks to |
//! |-------|------------|----------|
//! | [`RemoteApi`] | [`HttpRemoteApi`] | the 94RePdf back-end (auth, upload, analyze, process, status, download) |
//! | [`InferenceServer`] | [`OllamaClient`] | a local Ollama server (`/api/tags`, `/api/generate`) |
//! | [`OcrEngineFactory`] | [`TesseractEngine`] | the `tesseract` CLI with auto-provisioned language data |

pub mod ollama;
pub mod remote;
pub mod tesseract;

pub use ollama::{GenerateOptions, GenerateRequest, InferenceServer, OllamaClient};
pub use remote::{HttpRemoteApi, PptxRequest, RemoteApi, TaskProgress, TaskState, TaskStatus};
pub use tesseract::{
    OcrEngineFactory, OcrProgress, OcrProgressFn, OcrRecognition, OcrStatus, OcrWorker,
    TesseractEngine,
};
