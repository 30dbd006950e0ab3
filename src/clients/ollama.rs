//! Local inference server contract and its Ollama implementation.
//!
//! Only two endpoints are used: `GET /api/tags` for the availability probe
//! and a non-streaming `POST /api/generate` for recognition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::RepdfError;

/// Sampling options forwarded to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Base64-encoded images, without a `data:` prefix.
    pub images: Vec<String>,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// A locally running vision-model server.
#[async_trait]
pub trait InferenceServer: Send + Sync {
    /// Root URL, used in error messages.
    fn base_url(&self) -> &str;

    /// Names of installed models, e.g. `["qwen3-vl:8b", "llama3:latest"]`.
    async fn list_models(&self) -> Result<Vec<String>, RepdfError>;

    /// Run one non-streaming generation and return the raw response text.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, RepdfError>;
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// [`InferenceServer`] backed by Ollama's HTTP API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    generate_timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, generate_timeout: Duration) -> Result<Self, RepdfError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("repdf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepdfError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            generate_timeout,
        })
    }

    fn failed(&self, reason: impl Into<String>) -> RepdfError {
        RepdfError::InferenceFailed {
            url: self.base_url.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl InferenceServer for OllamaClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_models(&self) -> Result<Vec<String>, RepdfError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(self.failed(format!("HTTP {} from /api/tags", response.status())));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| self.failed(format!("invalid /api/tags body: {e}")))?;
        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        debug!("Ollama models: {:?}", names);
        Ok(names)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, RepdfError> {
        let url = format!("{}/api/generate", self.base_url);
        info!(
            "Local inference with {} ({} image(s))",
            request.model,
            request.images.len()
        );
        let response = self
            .client
            .post(&url)
            .timeout(self.generate_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.failed(format!(
                        "no response within {}s",
                        self.generate_timeout.as_secs()
                    ))
                } else {
                    self.failed(e.to_string())
                }
            })?;
        if !response.status().is_success() {
            return Err(self.failed(format!("HTTP {} from /api/generate", response.status())));
        }
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.failed(format!("invalid /api/generate body: {e}")))?;
        Ok(body.response)
    }
}

/// Whether `required` is among `installed`.
///
/// An untagged name also matches its `:latest` tag, the way the Ollama CLI
/// resolves `ollama run llava`.
pub fn has_model(installed: &[String], required: &str) -> bool {
    installed.iter().any(|name| {
        name == required || (!required.contains(':') && *name == format!("{required}:latest"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_model_exact_and_latest() {
        let installed = vec!["qwen3-vl:8b".to_string(), "llava:latest".to_string()];
        assert!(has_model(&installed, "qwen3-vl:8b"));
        assert!(has_model(&installed, "llava"));
        assert!(!has_model(&installed, "qwen3-vl:4b"));
        assert!(!has_model(&installed, "qwen3-vl"));
    }

    #[test]
    fn generate_request_wire_shape() {
        let req = GenerateRequest {
            model: "qwen3-vl:8b".into(),
            prompt: "read".into(),
            images: vec!["AAAA".into()],
            stream: false,
            options: GenerateOptions { temperature: 0.1 },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["images"][0], "AAAA");
        assert!((v["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn tags_body_tolerates_missing_models() {
        let t: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(t.models.is_empty());
    }

    #[test]
    fn base_url_trimmed() {
        let c = OllamaClient::new("http://localhost:11434/", Duration::from_secs(120)).unwrap();
        assert_eq!(c.base_url(), "http://localhost:11434");
    }
}
