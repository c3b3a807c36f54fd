//! Request-scoped relay logic.
//!
//! - [`engine`]: Unary and streamed chat exchanges
//! - [`health`]: Composite health status and model inventory
//! - [`types`]: Result and event shapes handed to the HTTP layer
//!
//! Nothing in this module lets a backend fault escape. Every path ends in a
//! structured value carrying `success = false` and the cause text, so the HTTP
//! layer only maps flags to status codes.

pub mod engine;
pub mod health;
pub mod types;

use std::any::Any;

pub use engine::{EventStream, RelayEngine};
pub use health::HealthAggregator;
pub use types::{
    BackendStatus, ChatRequest, ChatResult, HealthStatus, ModelList, OverallHealth, StreamEvent,
    ValidationError,
};

/// Best-effort text for a caught panic payload.
pub(crate) fn panic_cause(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("unexpected fault: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("unexpected fault: {msg}")
    } else {
        "unexpected fault".to_string()
    }
}
