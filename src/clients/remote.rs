//! Remote API contract and its reqwest implementation.
//!
//! Endpoints (relative to [`crate::ClientConfig::api_base`]):
//!
//! ```text
//! POST /auth/verify           {password}                 → 2xx | 401
//! POST /upload                multipart "file"           → {file_id}
//! GET  /analyze/{file_id}                                → {analysis: {...}}
//! POST /process/pptx          {file_id, output_ratio,
//!                              remove_watermark, use_local} → {task_id}
//! GET  /process/status/{id}                              → {status, progress, error?}
//! GET  /download/{id}                                    → PPTX bytes
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::RepdfError;
use crate::pipeline::input::StagedFile;
use crate::session::Analysis;

/// Body of `POST /process/pptx`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PptxRequest {
    pub file_id: String,
    pub output_ratio: String,
    pub remove_watermark: bool,
    pub use_local: bool,
}

/// Progress block of a status response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskProgress {
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub current_step: Option<String>,
}

impl TaskProgress {
    /// Percent rounded and clamped into `0..=100`.
    pub fn percent_u8(&self) -> u8 {
        if self.percent.is_nan() {
            return 0;
        }
        self.percent.round().clamp(0.0, 100.0) as u8
    }
}

/// Response of `GET /process/status/{task_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskStatus {
    pub status: String,
    #[serde(default)]
    pub progress: Option<TaskProgress>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskStatus {
    pub fn state(&self) -> TaskState {
        TaskState::from_wire(&self.status)
    }
}

/// Terminal/non-terminal classification of a task status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Anything that is not `done` or `failed` (`pending`, `processing`, …).
    Pending,
    Done,
    Failed,
}

impl TaskState {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "done" => TaskState::Done,
            "failed" => TaskState::Failed,
            _ => TaskState::Pending,
        }
    }
}

/// The remote conversion service.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// `Ok(true)` when the password is accepted, `Ok(false)` when the server
    /// answered with a rejection, `Err` when it could not be reached.
    async fn verify_password(&self, password: &str) -> Result<bool, RepdfError>;

    /// Upload the staged file; returns the server's `file_id`.
    async fn upload(&self, file: &StagedFile) -> Result<String, RepdfError>;

    async fn analyze(&self, file_id: &str) -> Result<Analysis, RepdfError>;

    /// Start a PPTX conversion job; returns its `task_id`.
    async fn start_pptx(&self, request: &PptxRequest) -> Result<String, RepdfError>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, RepdfError>;

    /// Fetch the finished artifact.
    async fn download(&self, task_id: &str) -> Result<Vec<u8>, RepdfError>;

    /// URL a browser would use to fetch the artifact.
    fn download_url(&self, task_id: &str) -> String;
}

#[derive(Deserialize)]
struct UploadResponse {
    file_id: String,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    analysis: Analysis,
}

#[derive(Deserialize)]
struct ProcessResponse {
    task_id: String,
}

/// [`RemoteApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    base: String,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, RepdfError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repdf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepdfError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send, require a 2xx status, and decode the JSON body.
    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RepdfError> {
        let response = checked(endpoint, request.send().await).await?;
        response.json::<T>().await.map_err(|e| RepdfError::Remote {
            endpoint: endpoint.to_string(),
            reason: format!("invalid response body: {e}"),
        })
    }
}

async fn checked(
    endpoint: &str,
    sent: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, RepdfError> {
    let response = sent.map_err(|e| RepdfError::Remote {
        endpoint: endpoint.to_string(),
        reason: if e.is_timeout() {
            "request timed out".to_string()
        } else {
            e.to_string()
        },
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = body.trim();
    Err(RepdfError::Remote {
        endpoint: endpoint.to_string(),
        reason: if detail.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", truncate(detail, 200))
        },
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn verify_password(&self, password: &str) -> Result<bool, RepdfError> {
        let url = self.url("/auth/verify");
        info!("Verifying password at {}", url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await
            .map_err(|e| RepdfError::AuthUnreachable {
                reason: e.to_string(),
            })?;
        debug!("auth/verify → {}", response.status());
        Ok(response.status().is_success())
    }

    async fn upload(&self, file: &StagedFile) -> Result<String, RepdfError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| RepdfError::Remote {
                endpoint: "upload".into(),
                reason: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        info!("Uploading {} ({} bytes)", file.name, file.size());
        let body: UploadResponse = self
            .json("upload", self.client.post(self.url("/upload")).multipart(form))
            .await?;
        Ok(body.file_id)
    }

    async fn analyze(&self, file_id: &str) -> Result<Analysis, RepdfError> {
        let body: AnalyzeResponse = self
            .json(
                "analyze",
                self.client.get(self.url(&format!("/analyze/{file_id}"))),
            )
            .await?;
        Ok(body.analysis)
    }

    async fn start_pptx(&self, request: &PptxRequest) -> Result<String, RepdfError> {
        info!(
            "Starting PPTX job for {} (ratio {}, watermark removal {})",
            request.file_id, request.output_ratio, request.remove_watermark
        );
        let body: ProcessResponse = self
            .json(
                "process/pptx",
                self.client.post(self.url("/process/pptx")).json(request),
            )
            .await?;
        Ok(body.task_id)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, RepdfError> {
        self.json(
            "process/status",
            self.client
                .get(self.url(&format!("/process/status/{task_id}"))),
        )
        .await
    }

    async fn download(&self, task_id: &str) -> Result<Vec<u8>, RepdfError> {
        let response = checked(
            "download",
            self.client.get(self.download_url(task_id)).send().await,
        )
        .await?;
        let bytes = response.bytes().await.map_err(|e| RepdfError::Remote {
            endpoint: "download".into(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    fn download_url(&self, task_id: &str) -> String {
        self.url(&format!("/download/{task_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_from_wire() {
        assert_eq!(TaskState::from_wire("done"), TaskState::Done);
        assert_eq!(TaskState::from_wire("failed"), TaskState::Failed);
        assert_eq!(TaskState::from_wire("pending"), TaskState::Pending);
        assert_eq!(TaskState::from_wire("processing"), TaskState::Pending);
    }

    #[test]
    fn status_with_progress_deserialises() {
        let json = r#"{"success":true,"task_id":"t","status":"processing",
            "progress":{"current_page":4,"total_pages":10,"current_step":"ocr","percent":40}}"#;
        let s: TaskStatus = serde_json::from_str(json).unwrap();
        assert_eq!(s.state(), TaskState::Pending);
        let p = s.progress.unwrap();
        assert_eq!(p.percent_u8(), 40);
        assert_eq!(p.current_page, Some(4));
        assert_eq!(p.current_step.as_deref(), Some("ocr"));
    }

    #[test]
    fn bare_status_deserialises() {
        let s: TaskStatus = serde_json::from_str(r#"{"status":"failed","error":"OOM"}"#).unwrap();
        assert_eq!(s.state(), TaskState::Failed);
        assert!(s.progress.is_none());
        assert_eq!(s.error.as_deref(), Some("OOM"));
    }

    #[test]
    fn percent_is_clamped() {
        let p = TaskProgress {
            percent: 140.2,
            ..Default::default()
        };
        assert_eq!(p.percent_u8(), 100);
        let n = TaskProgress {
            percent: -3.0,
            ..Default::default()
        };
        assert_eq!(n.percent_u8(), 0);
    }

    #[test]
    fn pptx_request_wire_shape() {
        let req = PptxRequest {
            file_id: "f1".into(),
            output_ratio: "16:9".into(),
            remove_watermark: true,
            use_local: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["file_id"], "f1");
        assert_eq!(v["output_ratio"], "16:9");
        assert_eq!(v["remove_watermark"], true);
        assert_eq!(v["use_local"], false);
    }

    #[test]
    fn download_url_joins_base() {
        let api = HttpRemoteApi::new("https://x.test/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.download_url("abc"), "https://x.test/api/download/abc");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("處理失敗啦", 2), "處理");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
