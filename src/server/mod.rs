//! HTTP surface over the relay.
//!
//! - [`api`]: Routes, handlers, and application state
//! - [`error`]: Mapping of request failures to HTTP responses
//! - [`streaming`]: Server-sent event framing for streamed chat

pub mod api;
pub mod error;
pub mod streaming;
