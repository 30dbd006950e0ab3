//! Configuration for the repdf client.
//!
//! Every endpoint, timeout and display constant lives in [`ClientConfig`],
//! built via its [`ClientConfigBuilder`]. The CLI maps its flags (and their
//! `REPDF_*` environment variables) onto the builder one-to-one.

use crate::error::RepdfError;
use crate::pipeline::input::MAX_FILE_SIZE_BYTES;
use crate::pipeline::mode::CostPolicy;
use crate::pipeline::poll::PollPolicy;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_OCR_LANGUAGES;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default remote API root, matching a locally served back-end.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
/// Vision model that must be installed for local AI to be offered.
pub const DEFAULT_VISION_MODEL: &str = "qwen3-vl:8b";

/// Configuration for a client session.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use repdf::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_base("https://repdf.example.org/api")
///     .max_poll_attempts(600)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Remote API root; endpoint paths such as `/upload` are appended.
    pub api_base: String,

    /// Local Ollama server root. Default: `http://localhost:11434`.
    pub ollama_url: String,

    /// Vision model used for local AI. Default: `qwen3-vl:8b`.
    ///
    /// The availability probe only offers local AI when this exact model is
    /// listed by the server.
    pub vision_model: String,

    /// Bound on the startup availability probe. Default: 3 s.
    pub probe_timeout_secs: u64,

    /// Per-request timeout for local inference. Default: 120 s.
    ///
    /// An 8B vision model on a laptop GPU can take well over a minute for a
    /// dense page.
    pub inference_timeout_secs: u64,

    /// Per-request timeout for remote API calls. Default: 60 s.
    pub api_timeout_secs: u64,

    /// Sampling temperature for local inference. Default: 0.1.
    pub temperature: f32,

    /// Confidence shown for local-AI results, which report none. Default: 95.
    pub local_ai_confidence: u8,

    /// Custom recognition prompt. If None, uses the built-in default.
    pub local_ai_prompt: Option<String>,

    /// Status polling cadence and optional ceilings for cloud jobs.
    pub poll: PollPolicy,

    /// Tesseract language spec. Default: `chi_tra+eng`.
    pub ocr_languages: String,

    /// Tesseract executable. If None, `TESSERACT_PATH` then `PATH` is searched.
    pub tesseract_path: Option<PathBuf>,

    /// Directory holding `.traineddata` files. If None, language data is
    /// located or downloaded automatically.
    pub tessdata_dir: Option<PathBuf>,

    /// Cookie file. If None, uses the per-user config directory.
    pub cookie_path: Option<PathBuf>,

    /// Persist the auth cookie across runs. Default: true.
    pub remember_login: bool,

    /// Lifetime of the auth cookie in days. Default: 7.
    pub cookie_lifetime_days: u32,

    /// Upload size limit in bytes. Default and maximum: 50 MiB.
    pub max_file_bytes: u64,

    /// Cloud cost display constants.
    pub cost: CostPolicy,

    /// Receives progress events while an executor runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            probe_timeout_secs: 3,
            inference_timeout_secs: 120,
            api_timeout_secs: 60,
            temperature: 0.1,
            local_ai_confidence: 95,
            local_ai_prompt: None,
            poll: PollPolicy::default(),
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            tesseract_path: None,
            tessdata_dir: None,
            cookie_path: None,
            remember_login: true,
            cookie_lifetime_days: 7,
            max_file_bytes: MAX_FILE_SIZE_BYTES,
            cost: CostPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base", &self.api_base)
            .field("ollama_url", &self.ollama_url)
            .field("vision_model", &self.vision_model)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("poll", &self.poll)
            .field("ocr_languages", &self.ocr_languages)
            .field("tesseract_path", &self.tesseract_path)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("cookie_path", &self.cookie_path)
            .field("remember_login", &self.remember_login)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("cost", &self.cost)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProcessingProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.config.ollama_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs.max(1);
        self
    }

    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_timeout_secs = secs.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn local_ai_confidence(mut self, c: u8) -> Self {
        self.config.local_ai_confidence = c;
        self
    }

    pub fn local_ai_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.local_ai_prompt = Some(prompt.into());
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.config.poll = policy;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.poll.max_attempts = Some(n);
        self
    }

    pub fn max_poll_duration(mut self, d: Duration) -> Self {
        self.config.poll.max_duration = Some(d);
        self
    }

    pub fn ocr_languages(mut self, spec: impl Into<String>) -> Self {
        self.config.ocr_languages = spec.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn cookie_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cookie_path = Some(path.into());
        self
    }

    pub fn remember_login(mut self, v: bool) -> Self {
        self.config.remember_login = v;
        self
    }

    pub fn cookie_lifetime_days(mut self, days: u32) -> Self {
        self.config.cookie_lifetime_days = days;
        self
    }

    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn cost_policy(mut self, cost: CostPolicy) -> Self {
        self.config.cost = cost;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, RepdfError> {
        let c = &self.config;
        for (field, url) in [("api_base", &c.api_base), ("ollama_url", &c.ollama_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RepdfError::InvalidConfig(format!(
                    "{field} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if c.vision_model.trim().is_empty() {
            return Err(RepdfError::InvalidConfig("vision model must not be empty".into()));
        }
        if c.local_ai_confidence > 100 {
            return Err(RepdfError::InvalidConfig(format!(
                "local AI confidence must be 0–100, got {}",
                c.local_ai_confidence
            )));
        }
        if c.max_file_bytes == 0 || c.max_file_bytes > MAX_FILE_SIZE_BYTES {
            return Err(RepdfError::InvalidConfig(format!(
                "max file size must be 1 byte to {} MiB, got {} bytes",
                MAX_FILE_SIZE_BYTES / (1024 * 1024),
                c.max_file_bytes
            )));
        }
        if c.cookie_lifetime_days == 0 {
            return Err(RepdfError::InvalidConfig("cookie lifetime must be ≥ 1 day".into()));
        }
        if c.poll.interval.is_zero() || c.poll.retry_interval.is_zero() {
            return Err(RepdfError::InvalidConfig("poll intervals must be non-zero".into()));
        }
        tessdata_auto::parse_languages(&c.ocr_languages)
            .map_err(|e| RepdfError::InvalidConfig(e.to_string()))?;
        Ok(self.config)
    }
}
