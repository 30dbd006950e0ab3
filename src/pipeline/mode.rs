//! Mode selection, availability probing and cost display.
//!
//! Selecting a mode is pure: it updates `ocr_mode` and derives the cost line
//! and hint, but never touches the network. The only network call here is
//! the startup probe of the local inference server, bounded by a timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::clients::ollama::has_model;
use crate::clients::InferenceServer;
use crate::error::RepdfError;
use crate::session::{OcrMode, SessionState};

// ── Availability probe ───────────────────────────────────────────────────

/// Outcome of probing the local inference server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    /// Why local AI is unavailable; `None` when available.
    pub reason: Option<String>,
}

/// List installed models within `timeout` and require `model` among them.
pub async fn probe_local_ai(
    server: &dyn InferenceServer,
    model: &str,
    timeout: Duration,
) -> Availability {
    let unavailable = |reason: String| {
        info!("Local AI unavailable: {}", reason);
        Availability {
            available: false,
            reason: Some(reason),
        }
    };

    match tokio::time::timeout(timeout, server.list_models()).await {
        Err(_) => unavailable(format!(
            "Ollama at {} did not answer within {}s",
            server.base_url(),
            timeout.as_secs()
        )),
        Ok(Err(e)) => unavailable(format!("Ollama is not running ({e})")),
        Ok(Ok(models)) if has_model(&models, model) => {
            info!("Local AI available: {} on {}", model, server.base_url());
            Availability {
                available: true,
                reason: None,
            }
        }
        Ok(Ok(_)) => unavailable(format!(
            "model {model} is not installed; run `ollama pull {model}`"
        )),
    }
}

/// Local AI when available, otherwise local OCR.
pub fn default_mode(ollama_available: bool) -> OcrMode {
    if ollama_available {
        OcrMode::LocalAi
    } else {
        OcrMode::LocalOcr
    }
}

// ── Cost display ─────────────────────────────────────────────────────────

/// Constants behind the cloud cost line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPolicy {
    /// Hosted-model price per page. Default: 0.0004 USD.
    pub usd_per_page: f64,
    /// Fixed conversion rate for the secondary currency. Default: 31.
    pub twd_per_usd: f64,
    /// Documents below this many pages fit in the daily free quota.
    pub free_quota_pages: u32,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            usd_per_page: 0.0004,
            twd_per_usd: 31.0,
            free_quota_pages: 1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostFraming {
    /// Local processing, never charged.
    Free,
    /// Cloud processing covered by the free quota.
    WithinFreeQuota,
    /// Cloud processing that will be billed.
    ExpectedCharge,
}

/// Cost shown next to the selected mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostDisplay {
    pub usd: f64,
    pub twd: f64,
    pub framing: CostFraming,
}

impl CostDisplay {
    /// USD to 4 decimals, e.g. `"0.0040"`.
    pub fn usd_text(&self) -> String {
        format!("{:.4}", self.usd)
    }

    /// TWD to 3 decimals, e.g. `"0.124"`.
    pub fn twd_text(&self) -> String {
        format!("{:.3}", self.twd)
    }

    pub fn line(&self) -> String {
        match self.framing {
            CostFraming::Free => "Free".to_string(),
            CostFraming::WithinFreeQuota => format!(
                "Free (within daily quota) · list price US${} ≈ NT${}",
                self.usd_text(),
                self.twd_text()
            ),
            CostFraming::ExpectedCharge => format!(
                "Expected charge: US${} ≈ NT${}",
                self.usd_text(),
                self.twd_text()
            ),
        }
    }
}

/// Cost for processing `pages` pages in `mode`.
pub fn cost_for(mode: OcrMode, pages: u32, policy: &CostPolicy) -> CostDisplay {
    if mode.is_local() {
        return CostDisplay {
            usd: 0.0,
            twd: 0.0,
            framing: CostFraming::Free,
        };
    }
    let usd = f64::from(pages) * policy.usd_per_page;
    CostDisplay {
        usd,
        twd: usd * policy.twd_per_usd,
        framing: if pages < policy.free_quota_pages {
            CostFraming::WithinFreeQuota
        } else {
            CostFraming::ExpectedCharge
        },
    }
}

/// Short description shown under the mode picker.
pub fn hint(mode: OcrMode) -> &'static str {
    match mode {
        OcrMode::LocalAi => {
            "Runs a vision model on this machine through Ollama. Images only; nothing leaves your computer."
        }
        OcrMode::LocalOcr => {
            "Runs Tesseract on this machine (Traditional Chinese + English). Images only; works offline."
        }
        OcrMode::CloudAi => {
            "Sends the uploaded file to the 94RePdf server for AI recognition and PPTX generation. Supports PDFs."
        }
    }
}

// ── Selection ────────────────────────────────────────────────────────────

/// What the UI shows after a mode is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSelection {
    pub mode: OcrMode,
    pub cost: CostDisplay,
    pub hint: &'static str,
}

/// Make `mode` the active mode. Idempotent.
///
/// Selecting local AI while it is unavailable fails and leaves `ocr_mode`
/// unchanged.
pub fn select(
    session: &mut SessionState,
    mode: OcrMode,
    policy: &CostPolicy,
) -> Result<ModeSelection, RepdfError> {
    if mode == OcrMode::LocalAi && !session.ollama_available {
        warn!("Local AI selected but unavailable; keeping {}", session.ocr_mode);
        return Err(RepdfError::ModeUnavailable {
            mode,
            reason: "Ollama is not running or the vision model is not installed. \
                     Start Ollama and pull the model, or pick another mode."
                .into(),
        });
    }

    session.ocr_mode = mode;
    Ok(ModeSelection {
        mode,
        cost: cost_for(mode, session.pages(), policy),
        hint: hint(mode),
    })
}
