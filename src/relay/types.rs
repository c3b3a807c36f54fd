//! Values produced by the relay for one request.
//!
//! Every field is always present; the HTTP layer never probes for optional
//! keys beyond `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of the human-readable text returned in place of a reply on failure.
const ERROR_PREFIX: &str = "Error generating response";

/// Input rejected before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message must not be empty")]
    EmptyMessage,
}

/// A chat request from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Backend model name; the configured default is used when absent.
    #[serde(default)]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

/// Outcome of one unary chat call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResult {
    #[serde(rename = "response")]
    pub response_text: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResult {
    pub fn success(response_text: String, model: String) -> Self {
        Self {
            response_text,
            model,
            timestamp: Utc::now(),
            success: true,
            error: None,
        }
    }

    pub fn failure(model: String, cause: String) -> Self {
        Self {
            response_text: format!("{ERROR_PREFIX}: {cause}"),
            model,
            timestamp: Utc::now(),
            success: false,
            error: Some(cause),
        }
    }
}

/// One event of a streamed chat call.
///
/// Serialized with the field names browser clients already consume
/// (`chunk`, `full_response`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "chunk")]
    pub delta_text: String,
    #[serde(rename = "full_response")]
    pub accumulated_text: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamEvent {
    pub fn delta(delta_text: &str, accumulated_text: &str, model: &str, done: bool) -> Self {
        Self {
            delta_text: delta_text.to_string(),
            accumulated_text: accumulated_text.to_string(),
            model: model.to_string(),
            timestamp: Utc::now(),
            success: true,
            done,
            error: None,
        }
    }

    /// Terminal event for a stream that failed.
    pub fn failure(model: &str, cause: String) -> Self {
        Self {
            delta_text: String::new(),
            accumulated_text: format!("{ERROR_PREFIX}: {cause}"),
            model: model.to_string(),
            timestamp: Utc::now(),
            success: false,
            done: true,
            error: Some(cause),
        }
    }
}

/// Composite verdict reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Backend status as seen by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Healthy,
    Unhealthy,
    Unreachable,
    Unknown,
}

impl std::fmt::Display for OverallHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallHealth::Healthy => write!(f, "healthy"),
            OverallHealth::Degraded => write!(f, "degraded"),
            OverallHealth::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendStatus::Healthy => write!(f, "healthy"),
            BackendStatus::Unhealthy => write!(f, "unhealthy"),
            BackendStatus::Unreachable => write!(f, "unreachable"),
            BackendStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    #[serde(rename = "status")]
    pub overall: OverallHealth,
    pub message: String,
    #[serde(rename = "backendStatus")]
    pub backend_status: BackendStatus,
}

/// Models installed on the backend, in backend order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelList {
    pub success: bool,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
