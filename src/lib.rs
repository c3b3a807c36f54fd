//! ollama-relay: HTTP relay in front of a local Ollama runtime.
//!
//! Forwards chat prompts to the backend and returns generated text, either
//! as one response or as a stream of server-sent events. Also reports a
//! composite health status and the backend's model inventory.

pub mod config;
pub mod relay;
pub mod server;
pub mod upstream;
