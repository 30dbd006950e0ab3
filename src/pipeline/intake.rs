//! File intake: validate, stage, upload, analyze.
//!
//! Validation (type, then size) runs before any network call. Once the file
//! passes it is kept in the session no matter what happens next, because the
//! local modes read it directly and never re-fetch it from the server.
//!
//! Upload and analysis are best-effort. When either fails, a default
//! [`Analysis::fallback`] is substituted and the session still moves on to the
//! analysis step; the returned [`AnalysisSource`] tells the caller which case
//! it is in.

use tracing::{info, warn};

use crate::clients::RemoteApi;
use crate::error::RepdfError;
use crate::pipeline::input::StagedFile;
use crate::session::{Analysis, AnalysisSource, Screen, SessionState};

/// Result of staging a file.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeOutcome {
    pub analysis: Analysis,
    pub source: AnalysisSource,
}

/// Stage `file` into `session` and obtain its analysis.
///
/// Errors only on validation failure; connectivity problems degrade to the
/// fallback analysis.
pub async fn stage(
    api: &dyn RemoteApi,
    session: &mut SessionState,
    file: StagedFile,
    max_bytes: u64,
) -> Result<IntakeOutcome, RepdfError> {
    let kind = file.validate(max_bytes)?;
    info!("Staging {} ({:?}, {} bytes)", file.name, kind, file.size());

    session.file_id = None;
    session.task_id = None;
    session.analysis = None;
    session.analysis_source = None;
    let file = &*session.uploaded_file.insert(file);

    let (analysis, source) = match upload_and_analyze(api, file, &mut session.file_id).await {
        Ok(analysis) => (analysis, AnalysisSource::Remote),
        Err(e) => {
            warn!("Analysis unavailable, continuing with defaults: {}", e);
            (
                Analysis::fallback(),
                AnalysisSource::Fallback {
                    reason: e.to_string(),
                },
            )
        }
    };

    session.analysis = Some(analysis.clone());
    session.analysis_source = Some(source.clone());
    session.screen = Screen::Analyze;

    Ok(IntakeOutcome { analysis, source })
}

async fn upload_and_analyze(
    api: &dyn RemoteApi,
    file: &StagedFile,
    file_id: &mut Option<String>,
) -> Result<Analysis, RepdfError> {
    let id = file_id.insert(api.upload(file).await?);
    info!("Uploaded as {}", id);
    api.analyze(id).await
}
