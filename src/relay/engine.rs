//! Relay engine: one user message in, one result or event sequence out.
//!
//! The engine resolves the model name, calls the upstream client, and maps
//! whatever comes back (text, chunks, faults, even panics inside the client)
//! into [`ChatResult`] / [`StreamEvent`] values.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tracing::{debug, warn};

use super::panic_cause;
use super::types::{ChatRequest, ChatResult, StreamEvent, ValidationError};
use crate::upstream::{ChunkStream, Upstream};

/// Events of one streamed chat call. Ends exactly once with `done = true`.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Orchestrates chat exchanges against a shared upstream client.
#[derive(Clone)]
pub struct RelayEngine {
    upstream: Arc<dyn Upstream>,
    default_model: String,
}

impl RelayEngine {
    pub fn new(upstream: Arc<dyn Upstream>, default_model: impl Into<String>) -> Self {
        Self {
            upstream,
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The requested model if one was given, else the configured default.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(model) if !model.is_empty() => model.to_string(),
            _ => self.default_model.clone(),
        }
    }

    /// Run a unary chat call.
    ///
    /// Only validation failures are returned as `Err`. Backend faults come back
    /// as a `ChatResult` with `success = false`.
    pub async fn generate(&self, request: &ChatRequest) -> Result<ChatResult, ValidationError> {
        request.validate()?;
        let model = self.resolve_model(request.model.as_deref());

        let outcome = AssertUnwindSafe(self.upstream.complete_chat(&request.message, &model))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(text)) => ChatResult::success(text, model),
            Ok(Err(e)) => {
                warn!(model = %model, error = %e, "Chat completion failed");
                ChatResult::failure(model, e.to_string())
            }
            Err(payload) => {
                let cause = panic_cause(payload);
                warn!(model = %model, error = %cause, "Chat completion aborted");
                ChatResult::failure(model, cause)
            }
        };

        Ok(result)
    }

    /// Start a streamed chat call.
    ///
    /// Validation happens immediately; the backend connection is opened when
    /// the returned stream is first polled. Dropping the stream closes it.
    pub fn stream(&self, request: &ChatRequest) -> Result<EventStream, ValidationError> {
        request.validate()?;

        let relay = StreamRelay {
            model: self.resolve_model(request.model.as_deref()),
            accumulated: String::new(),
            phase: Phase::Connect {
                upstream: self.upstream.clone(),
                message: request.message.clone(),
            },
        };

        Ok(stream::unfold(relay, |mut relay| async move {
            let event = relay.next_event().await?;
            Some((event, relay))
        })
        .boxed())
    }
}

/// Per-call state of a streamed exchange.
struct StreamRelay {
    model: String,
    accumulated: String,
    phase: Phase,
}

enum Phase {
    Connect {
        upstream: Arc<dyn Upstream>,
        message: String,
    },
    Streaming(ChunkStream),
    Finished,
}

impl StreamRelay {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return None,

                Phase::Connect { upstream, message } => {
                    let opened = AssertUnwindSafe(upstream.stream_chat(&message, &self.model))
                        .catch_unwind()
                        .await;

                    match opened {
                        Ok(Ok(chunks)) => self.phase = Phase::Streaming(chunks),
                        Ok(Err(e)) => return Some(self.fail(e.to_string())),
                        Err(payload) => return Some(self.fail(panic_cause(payload))),
                    }
                }

                Phase::Streaming(mut chunks) => {
                    let next = AssertUnwindSafe(chunks.next()).catch_unwind().await;

                    let chunk = match next {
                        Ok(Some(Ok(chunk))) => chunk,
                        Ok(Some(Err(e))) => return Some(self.fail(e.to_string())),
                        Ok(None) => {
                            return Some(
                                self.fail("backend closed the stream before completion".to_string()),
                            )
                        }
                        Err(payload) => return Some(self.fail(panic_cause(payload))),
                    };

                    let delta = match chunk.content() {
                        Some(text) => text,
                        // Chunks without content are skipped unless they end the stream.
                        None if !chunk.done => {
                            self.phase = Phase::Streaming(chunks);
                            continue;
                        }
                        None => "",
                    };

                    self.accumulated.push_str(delta);
                    let event = StreamEvent::delta(delta, &self.accumulated, &self.model, chunk.done);

                    if chunk.done {
                        debug!(
                            model = %self.model,
                            chars = self.accumulated.len(),
                            "Stream complete"
                        );
                    } else {
                        self.phase = Phase::Streaming(chunks);
                    }

                    return Some(event);
                }
            }
        }
    }

    /// Build the terminal failure event. The phase is already `Finished`.
    fn fail(&self, cause: String) -> StreamEvent {
        warn!(model = %self.model, error = %cause, "Chat stream failed");
        StreamEvent::failure(&self.model, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{Probe, UpstreamError};
    use async_trait::async_trait;

    /// Backend that must never be reached.
    struct Unreachable;

    #[async_trait]
    impl Upstream for Unreachable {
        async fn complete_chat(&self, _: &str, _: &str) -> Result<String, UpstreamError> {
            panic!("backend called")
        }
        async fn stream_chat(&self, _: &str, _: &str) -> Result<ChunkStream, UpstreamError> {
            panic!("backend called")
        }
        async fn probe(&self) -> Result<Probe, UpstreamError> {
            panic!("backend called")
        }
        async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
            panic!("backend called")
        }
    }

    fn engine() -> RelayEngine {
        RelayEngine::new(Arc::new(Unreachable), "mistral:latest")
    }

    #[test]
    fn test_resolve_model() {
        let engine = engine();
        assert_eq!(engine.resolve_model(None), "mistral:latest");
        assert_eq!(engine.resolve_model(Some("")), "mistral:latest");
        assert_eq!(engine.resolve_model(Some("llama3:8b")), "llama3:8b");
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let engine = engine();
        let err = engine.generate(&ChatRequest::new("")).await.unwrap_err();
        assert_eq!(err, ValidationError::EmptyMessage);
        assert!(engine.stream(&ChatRequest::new("")).is_err());
    }

    #[tokio::test]
    async fn test_panicking_backend_is_contained() {
        let result = engine().generate(&ChatRequest::new("hi")).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unexpected fault: backend called"));
    }
}
