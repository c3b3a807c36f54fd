//! Scripted upstream backend shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use ollama_relay::config::Config;
use ollama_relay::relay::{HealthAggregator, RelayEngine};
use ollama_relay::server::api::AppState;
use ollama_relay::upstream::{ChatChunk, ChunkStream, Probe, Upstream, UpstreamError};

pub const DEFAULT_MODEL: &str = "mistral:latest";

/// One item the stub stream yields.
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str, bool),
    Bare(bool),
    Fail(&'static str),
}

#[derive(Debug, Clone)]
pub enum ProbeScript {
    Reachable(Vec<&'static str>),
    Unhealthy(u16),
    Unreachable,
    Fail(&'static str),
    Panic,
}

/// Upstream that replays a fixed script and counts every call.
pub struct StubUpstream {
    reply: Result<String, String>,
    steps: Vec<Step>,
    open_error: Option<String>,
    probe: ProbeScript,
    models: Result<Vec<String>, String>,
    calls: AtomicUsize,
    models_used: Mutex<Vec<String>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self {
            reply: Ok("Hello there".to_string()),
            steps: vec![
                Step::Text("Hel", false),
                Step::Text("lo", false),
                Step::Text("", true),
            ],
            open_error: None,
            probe: ProbeScript::Reachable(vec![DEFAULT_MODEL]),
            models: Ok(vec![DEFAULT_MODEL.to_string()]),
            calls: AtomicUsize::new(0),
            models_used: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, text: &str) -> Self {
        self.reply = Ok(text.to_string());
        self
    }

    pub fn reply_error(mut self, cause: &str) -> Self {
        self.reply = Err(cause.to_string());
        self
    }

    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn open_error(mut self, cause: &str) -> Self {
        self.open_error = Some(cause.to_string());
        self
    }

    pub fn probe(mut self, probe: ProbeScript) -> Self {
        self.probe = probe;
        self
    }

    pub fn models(mut self, models: &[&str]) -> Self {
        self.models = Ok(models.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn models_error(mut self, cause: &str) -> Self {
        self.models = Err(cause.to_string());
        self
    }

    /// Number of backend calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Model name passed to the most recent chat call.
    pub fn last_model(&self) -> Option<String> {
        self.models_used.lock().unwrap().last().cloned()
    }

    fn record(&self, model: Option<&str>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(model) = model {
            self.models_used.lock().unwrap().push(model.to_string());
        }
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn complete_chat(&self, _message: &str, model: &str) -> Result<String, UpstreamError> {
        self.record(Some(model));
        self.reply.clone().map_err(|cause| UpstreamError::Connection {
            endpoint: "http://stub/api/chat".to_string(),
            reason: cause,
        })
    }

    async fn stream_chat(&self, _message: &str, model: &str) -> Result<ChunkStream, UpstreamError> {
        self.record(Some(model));
        if let Some(cause) = &self.open_error {
            return Err(UpstreamError::Http {
                status: 404,
                body: cause.clone(),
            });
        }

        let items: Vec<Result<ChatChunk, UpstreamError>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Text(text, done) => Ok(ChatChunk::text(*text, *done)),
                Step::Bare(done) => Ok(ChatChunk::bare(*done)),
                Step::Fail(cause) => Err(UpstreamError::Stream(cause.to_string())),
            })
            .collect();

        Ok(stream::iter(items).boxed())
    }

    async fn probe(&self) -> Result<Probe, UpstreamError> {
        self.record(None);
        match &self.probe {
            ProbeScript::Reachable(models) => Ok(Probe::Reachable {
                models: models.iter().map(|m| m.to_string()).collect(),
            }),
            ProbeScript::Unhealthy(status) => Ok(Probe::Unhealthy { status: *status }),
            ProbeScript::Unreachable => Ok(Probe::Unreachable {
                reason: "connection refused".to_string(),
            }),
            ProbeScript::Fail(cause) => Err(UpstreamError::Decode(cause.to_string())),
            ProbeScript::Panic => panic!("probe blew up"),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
        self.record(None);
        self.models.clone().map_err(|cause| UpstreamError::Connection {
            endpoint: "http://stub/api/tags".to_string(),
            reason: cause,
        })
    }
}

pub fn engine(stub: &Arc<StubUpstream>) -> RelayEngine {
    RelayEngine::new(stub.clone(), DEFAULT_MODEL)
}

pub fn app_state(stub: &Arc<StubUpstream>, config: Config) -> Arc<AppState> {
    Arc::new(AppState {
        relay: RelayEngine::new(stub.clone(), config.backend.default_model.clone()),
        health: HealthAggregator::new(stub.clone()),
        config: Arc::new(config),
    })
}
