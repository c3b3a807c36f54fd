//! Client side of the inference backend.
//!
//! - [`client`]: reqwest-based client for the Ollama HTTP API
//! - [`errors`]: Fault taxonomy for backend calls
//! - [`ndjson`]: Decoder for Ollama's newline-delimited JSON chat stream
//! - [`types`]: Wire types exchanged with the backend
//!
//! The [`Upstream`] trait is the seam the relay engine and health aggregator
//! depend on. Implementations report faults as [`UpstreamError`]; they never
//! convert them into results, with the single exception of [`Upstream::probe`],
//! which classifies network-level failures as [`Probe::Unreachable`].

pub mod client;
pub mod errors;
pub mod ndjson;
pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use client::OllamaClient;
pub use errors::UpstreamError;
pub use types::ChatChunk;

/// Lazy, finite, non-restartable sequence of backend chunks in backend order.
///
/// Dropping the stream releases the underlying HTTP connection.
pub type ChunkStream = BoxStream<'static, Result<ChatChunk, UpstreamError>>;

/// Outcome of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Backend answered with 2xx. Model names are in backend order.
    Reachable { models: Vec<String> },

    /// Backend answered, but with a non-2xx status.
    Unhealthy { status: u16 },

    /// Connection failed or the probe timed out.
    Unreachable { reason: String },
}

/// Operations the relay needs from an inference backend.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Single non-streaming chat call. Returns the full assistant message.
    async fn complete_chat(&self, message: &str, model: &str) -> Result<String, UpstreamError>;

    /// Open a streaming chat call.
    async fn stream_chat(&self, message: &str, model: &str) -> Result<ChunkStream, UpstreamError>;

    /// Lightweight inventory request with a short timeout.
    async fn probe(&self) -> Result<Probe, UpstreamError>;

    /// Model inventory, without the probe's reachability classification.
    async fn list_models(&self) -> Result<Vec<String>, UpstreamError>;
}
