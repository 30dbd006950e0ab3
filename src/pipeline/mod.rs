//! Pipeline stages of a processing session.
//!
//! Each submodule owns one step of the flow between screens. Stages take
//! their collaborators as trait objects so every step is testable without a
//! server, an Ollama install or a tesseract binary.
//!
//! ## Data Flow
//!
//! ```text
//! auth ──▶ input ──▶ intake ──▶ mode ──▶ executor ──▶ present
//! (cookie)  (validate) (upload,   (probe,   (local AI /   (view,
//!                      analyze)   cost)     local OCR /   actions)
//!                                           cloud + poll)
//! ```
//!
//! 1. [`auth`]    verify the access password and persist the auth cookie
//! 2. [`input`]   read and validate a file before anything leaves the machine
//! 3. [`intake`]  upload and analyze, falling back to default analysis
//! 4. [`mode`]    availability probe, mode selection and cost display
//! 5. [`executor`] one strategy per mode, with [`encode`], [`postprocess`]
//!    and [`poll`] as helpers
//! 6. [`present`] turn an executor's output into a view and its actions

pub mod auth;
pub mod encode;
pub mod executor;
pub mod input;
pub mod intake;
pub mod mode;
pub mod poll;
pub mod postprocess;
pub mod present;
