//! Ollama HTTP client.
//!
//! Holds one pooled `reqwest::Client` and the backend base address. It has no
//! mutable state, so a single instance is shared by every request task.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use tracing::debug;

use super::errors::UpstreamError;
use super::ndjson::decode_chunks;
use super::types::{ChatChunk, ChatRequestBody, TagsResponse};
use super::{ChunkStream, Probe, Upstream};
use crate::config::Config;

/// TCP connection timeout. Chat calls otherwise run without a deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a single Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    probe_timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the server at `base_url`.
    ///
    /// Does not check connectivity; that happens on the first request.
    pub fn new(base_url: impl Into<String>, probe_timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| UpstreamError::Connection {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url,
            probe_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        Self::new(config.backend_base_url(), config.backend.probe_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_chat(
        &self,
        message: &str,
        model: &str,
        stream: bool,
    ) -> Result<reqwest::Response, UpstreamError> {
        let url = self.endpoint("/api/chat");
        let body = ChatRequestBody::user(model, message, stream);

        debug!(url = %url, model, stream, "Sending chat request");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, e))?;

        ensure_success(response).await
    }
}

/// Turn a non-2xx response into [`UpstreamError::Http`], keeping the body text.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Http {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Upstream for OllamaClient {
    async fn complete_chat(&self, message: &str, model: &str) -> Result<String, UpstreamError> {
        let response = self.post_chat(message, model, false).await?;

        let mut reply: ChatChunk = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if let Some(error) = reply.error.take() {
            return Err(UpstreamError::Backend(error));
        }

        reply
            .content()
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Decode("response has no message content".to_string()))
    }

    async fn stream_chat(&self, message: &str, model: &str) -> Result<ChunkStream, UpstreamError> {
        let response = self.post_chat(message, model, true).await?;
        Ok(decode_chunks(response.bytes_stream()).boxed())
    }

    async fn probe(&self) -> Result<Probe, UpstreamError> {
        let url = self.endpoint("/api/tags");

        let response = match self.http.get(&url).timeout(self.probe_timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "Probe failed to reach backend");
                return Ok(Probe::Unreachable {
                    reason: UpstreamError::from_reqwest(&url, e).to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(Probe::Unhealthy {
                status: status.as_u16(),
            });
        }

        match response.json::<TagsResponse>().await {
            Ok(tags) => Ok(Probe::Reachable {
                models: tags.into_names(),
            }),
            Err(e) if e.is_timeout() => Ok(Probe::Unreachable {
                reason: UpstreamError::from_reqwest(&url, e).to_string(),
            }),
            Err(e) => Err(UpstreamError::Decode(e.to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
        let url = self.endpoint("/api/tags");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, e))?;
        let response = ensure_success(response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(tags.into_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let client =
            OllamaClient::new("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.endpoint("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.backend.host = "http://10.0.0.2:11434".to_string();
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.2:11434");
        assert_eq!(client.probe_timeout, Duration::from_secs(5));
    }
}
