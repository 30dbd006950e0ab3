//! The processing orchestrator: one method per user gesture.
//!
//! [`Orchestrator`] owns the [`SessionState`] context object and the three
//! external collaborators. Every operation is `&mut self` and awaits its
//! network calls sequentially, so session state needs no locking and the
//! order of effects is the order of the code.
//!
//! ```text
//! start ──▶ authenticate ──▶ choose_feature ──▶ stage_file ──▶ select_mode ──▶ process ──▶ perform
//!  Auth        Upload            Upload           Analyze         Analyze       Progress     Result
//!                                                                                 │ error
//!                                                                                 ▼
//!                                                                              Analyze
//! ```

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clients::{
    HttpRemoteApi, InferenceServer, OcrEngineFactory, OllamaClient, RemoteApi, TesseractEngine,
};
use crate::config::ClientConfig;
use crate::error::RepdfError;
use crate::pipeline::auth::{self, CookieJar};
use crate::pipeline::executor::{
    self, CloudAiExecutor, ExecutionContext, LocalAiExecutor, LocalOcrExecutor, ModeExecutor,
    ProcessOptions,
};
use crate::pipeline::input::StagedFile;
use crate::pipeline::intake::{self, IntakeOutcome};
use crate::pipeline::mode::{self, Availability, ModeSelection};
use crate::pipeline::present::{ResultAction, ResultView};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::session::{Feature, OcrMode, Screen, SessionState};

/// What performing a [`ResultAction`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Text to place on the clipboard.
    Copied { text: String },
    /// A file written to disk.
    Saved { path: PathBuf },
}

/// Drives one processing session from the auth gate to the result view.
pub struct Orchestrator {
    config: ClientConfig,
    session: SessionState,
    jar: CookieJar,
    api: Arc<dyn RemoteApi>,
    inference: Arc<dyn InferenceServer>,
    ocr: Arc<dyn OcrEngineFactory>,
}

impl Orchestrator {
    /// Build an orchestrator with the production HTTP, Ollama and tesseract
    /// clients described by `config`.
    ///
    /// # Errors
    /// Returns `Err` when an HTTP client cannot be built or the cookie file
    /// exists but cannot be read.
    pub fn new(config: ClientConfig) -> Result<Self, RepdfError> {
        let api = Arc::new(HttpRemoteApi::new(&config.api_base, config.api_timeout())?);
        let inference = Arc::new(OllamaClient::new(
            &config.ollama_url,
            config.inference_timeout(),
        )?);
        let ocr = Arc::new(TesseractEngine::new(
            config.tesseract_path.clone(),
            config.tessdata_dir.clone(),
        ));
        let jar = if config.remember_login {
            CookieJar::open(
                config
                    .cookie_path
                    .clone()
                    .unwrap_or_else(CookieJar::default_path),
            )?
        } else {
            CookieJar::in_memory()
        };
        Ok(Self::with_clients(config, api, inference, ocr, jar))
    }

    /// Build an orchestrator around caller-supplied collaborators.
    pub fn with_clients(
        config: ClientConfig,
        api: Arc<dyn RemoteApi>,
        inference: Arc<dyn InferenceServer>,
        ocr: Arc<dyn OcrEngineFactory>,
        jar: CookieJar,
    ) -> Self {
        Self {
            config,
            session: SessionState::default(),
            jar,
            api,
            inference,
            ocr,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Restore auth from the cookie jar and probe the local inference server.
    ///
    /// Sets `ollama_available` and the default mode: local AI when
    /// available, otherwise local OCR.
    pub async fn start(&mut self) -> Availability {
        if auth::restore(&self.jar, Utc::now()) {
            info!("Restored authenticated session from cookie");
            self.session.authenticated = true;
            self.session.screen = Screen::Upload;
        }

        let availability = mode::probe_local_ai(
            self.inference.as_ref(),
            &self.config.vision_model,
            self.config.probe_timeout(),
        )
        .await;
        self.session.ollama_available = availability.available;
        self.session.ocr_mode = mode::default_mode(availability.available);
        availability
    }

    /// Verify `password` and unlock the upload step.
    ///
    /// # Errors
    /// * [`RepdfError::EmptyPassword`], no request sent
    /// * [`RepdfError::WrongPassword`] when the server rejects it
    /// * [`RepdfError::AuthUnreachable`] when the server cannot be reached
    pub async fn authenticate(&mut self, password: &str) -> Result<(), RepdfError> {
        auth::verify(
            self.api.as_ref(),
            &mut self.jar,
            password,
            self.config.cookie_lifetime_days,
        )
        .await?;
        self.session.authenticated = true;
        self.session.screen = Screen::Upload;
        Ok(())
    }

    /// Pick the conversion feature; returns the upload heading for it.
    pub fn choose_feature(&mut self, feature: Feature) -> Result<&'static str, RepdfError> {
        self.require_auth()?;
        self.session.current_feature = Some(feature);
        self.session.screen = Screen::Upload;
        debug!("Feature {} chosen", feature);
        Ok(feature.upload_title())
    }

    /// Validate, stage, upload and analyze `file`.
    ///
    /// Only validation errors are returned; connectivity failures degrade to
    /// the fallback analysis (see [`IntakeOutcome::source`]).
    pub async fn stage_file(&mut self, file: StagedFile) -> Result<IntakeOutcome, RepdfError> {
        self.require_auth()?;
        intake::stage(
            self.api.as_ref(),
            &mut self.session,
            file,
            self.config.max_file_bytes,
        )
        .await
    }

    /// Make `mode` active and return its cost line and hint. No network call.
    pub fn select_mode(&mut self, mode: OcrMode) -> Result<ModeSelection, RepdfError> {
        mode::select(&mut self.session, mode, &self.config.cost)
    }

    /// Run the executor for the active mode on the staged file.
    ///
    /// Lands on [`Screen::Result`] on success. On any failure the session
    /// returns to the error's safe prior step (the analysis step for
    /// everything an executor can raise) and the error is returned.
    pub async fn process(&mut self, options: &ProcessOptions) -> Result<ResultView, RepdfError> {
        self.require_auth()?;
        if self.session.uploaded_file.is_none() {
            return Err(RepdfError::NoFileStaged);
        }

        let mode = self.session.ocr_mode;
        let strategy = self.executor_for(mode);
        let callback: ProgressCallback = self
            .config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));

        self.session.screen = Screen::Progress;
        let (outcome, task_id) = match self.session.uploaded_file.as_ref() {
            Some(file) => {
                let mut ctx = ExecutionContext::new(
                    mode,
                    file,
                    self.session.file_id.as_deref(),
                    options,
                    callback,
                );
                let outcome = executor::run(strategy.as_ref(), &mut ctx).await;
                (outcome, ctx.task_id)
            }
            None => (Err(RepdfError::NoFileStaged), None),
        };

        if let Some(id) = task_id {
            self.session.task_id = Some(id);
        }
        match outcome {
            Ok(view) => {
                self.session.screen = Screen::Result;
                Ok(view)
            }
            Err(e) => {
                self.session.screen = e.return_screen();
                Err(e)
            }
        }
    }

    /// Carry out a result action. Downloads are written into `dest_dir`.
    pub async fn perform(
        &self,
        action: &ResultAction,
        dest_dir: &Path,
    ) -> Result<ActionOutcome, RepdfError> {
        match action {
            ResultAction::CopyText { text } => Ok(ActionOutcome::Copied { text: text.clone() }),
            ResultAction::DownloadImage { file_name }
            | ResultAction::DownloadOriginal { file_name } => {
                let file = self
                    .session
                    .uploaded_file
                    .as_ref()
                    .ok_or(RepdfError::NoFileStaged)?;
                let path = write_atomic(dest_dir, file_name, &file.bytes).await?;
                Ok(ActionOutcome::Saved { path })
            }
            ResultAction::DownloadArtifact { url, file_name } => {
                let task_id = self.session.task_id.as_deref().ok_or_else(|| {
                    RepdfError::Internal(format!("no finished task for {url}"))
                })?;
                info!("Downloading {}", url);
                let bytes = self.api.download(task_id).await?;
                let path = write_atomic(dest_dir, file_name, &bytes).await?;
                Ok(ActionOutcome::Saved { path })
            }
        }
    }

    fn require_auth(&self) -> Result<(), RepdfError> {
        if self.session.authenticated {
            Ok(())
        } else {
            Err(RepdfError::NotAuthenticated)
        }
    }

    fn executor_for(&self, mode: OcrMode) -> Box<dyn ModeExecutor> {
        match mode {
            OcrMode::LocalAi => Box::new(LocalAiExecutor::from_config(
                Arc::clone(&self.inference),
                &self.config,
            )),
            OcrMode::LocalOcr => Box::new(LocalOcrExecutor::with_languages(
                Arc::clone(&self.ocr),
                self.config.ocr_languages.clone(),
            )),
            OcrMode::CloudAi => Box::new(CloudAiExecutor::new(
                Arc::clone(&self.api),
                self.config.poll,
            )),
        }
    }
}

/// Write `bytes` to `dir/{file_name}` via a temp file and rename.
///
/// Only the final component of `file_name` is used, so names taken from
/// uploads cannot escape `dir`.
async fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, RepdfError> {
    let base = Path::new(file_name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    let path = dir.join(base);
    let write_err = |source| RepdfError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;
    let tmp = path.with_extension("part");
    tokio::fs::write(&tmp, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
