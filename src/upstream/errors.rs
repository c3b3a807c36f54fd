//! Upstream error types.
//!
//! Variants split along the two ways a backend call goes wrong: the backend
//! could not be reached at all, or it answered with something unusable.

use thiserror::Error;

/// Errors that can occur while talking to the inference backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// TCP/HTTP connection to the backend failed.
    #[error("connection failed to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The request did not complete within its timeout.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Non-2xx HTTP response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("malformed backend response: {0}")]
    Decode(String),

    /// Reading the chunked body failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// The backend reported an error inside an otherwise valid response.
    #[error("backend error: {0}")]
    Backend(String),
}

impl UpstreamError {
    /// Classify a reqwest error raised while sending a request to `endpoint`.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Connection {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// True when the backend could not be reached (as opposed to answering badly).
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Connection { .. } | UpstreamError::Timeout { .. }
        )
    }
}
