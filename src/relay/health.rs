//! Health aggregation over the upstream probe.
//!
//! Two failure boundaries produce distinct statuses:
//! 1. The probe itself classifies network faults (`Probe::Unreachable`) and
//!    bad status codes (`Probe::Unhealthy`). The API is still up, so the
//!    overall verdict is `degraded`.
//! 2. Anything the probe could not classify (an `Err`, or a panic inside the
//!    client) makes the verdict `unhealthy` with an `unknown` backend.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use super::panic_cause;
use super::types::{BackendStatus, HealthStatus, ModelList, OverallHealth};
use crate::upstream::{Probe, Upstream};

const RUNNING: &str = "API is running";

#[derive(Clone)]
pub struct HealthAggregator {
    upstream: Arc<dyn Upstream>,
}

impl HealthAggregator {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Probe the backend and fold the outcome into one status. Never cached.
    pub async fn check_health(&self) -> HealthStatus {
        let outcome = AssertUnwindSafe(self.upstream.probe()).catch_unwind().await;

        match outcome {
            Ok(Ok(probe)) => {
                debug!(?probe, "Backend probe finished");
                from_probe(&probe)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Health check failed");
                check_failed(e.to_string())
            }
            Err(payload) => {
                let cause = panic_cause(payload);
                warn!(error = %cause, "Health check aborted");
                check_failed(cause)
            }
        }
    }

    /// Models installed on the backend. Failures yield an empty list.
    pub async fn list_models(&self) -> ModelList {
        let outcome = AssertUnwindSafe(self.upstream.list_models())
            .catch_unwind()
            .await;

        let cause = match outcome {
            Ok(Ok(models)) => {
                return ModelList {
                    success: true,
                    models,
                    error: None,
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_cause(payload),
        };

        warn!(error = %cause, "Listing models failed");
        ModelList {
            success: false,
            models: Vec::new(),
            error: Some(cause),
        }
    }
}

fn from_probe(probe: &Probe) -> HealthStatus {
    let backend_status = match probe {
        Probe::Reachable { .. } => BackendStatus::Healthy,
        Probe::Unhealthy { .. } => BackendStatus::Unhealthy,
        Probe::Unreachable { .. } => BackendStatus::Unreachable,
    };

    let overall = if backend_status == BackendStatus::Healthy {
        OverallHealth::Healthy
    } else {
        OverallHealth::Degraded
    };

    HealthStatus {
        overall,
        message: RUNNING.to_string(),
        backend_status,
    }
}

fn check_failed(cause: String) -> HealthStatus {
    HealthStatus {
        overall: OverallHealth::Unhealthy,
        message: format!("Health check failed: {cause}"),
        backend_status: BackendStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_mapping() {
        let status = from_probe(&Probe::Reachable {
            models: vec!["mistral:latest".into()],
        });
        assert_eq!(status.overall, OverallHealth::Healthy);
        assert_eq!(status.backend_status, BackendStatus::Healthy);

        let status = from_probe(&Probe::Unhealthy { status: 503 });
        assert_eq!(status.overall, OverallHealth::Degraded);
        assert_eq!(status.backend_status, BackendStatus::Unhealthy);

        let status = from_probe(&Probe::Unreachable {
            reason: "connection refused".into(),
        });
        assert_eq!(status.overall, OverallHealth::Degraded);
        assert_eq!(status.backend_status, BackendStatus::Unreachable);
        assert_eq!(status.message, "API is running");
    }

    #[test]
    fn test_check_failed() {
        let status = check_failed("malformed backend response: eof".into());
        assert_eq!(status.overall, OverallHealth::Unhealthy);
        assert_eq!(status.backend_status, BackendStatus::Unknown);
        assert!(status.message.contains("malformed backend response"));
    }
}
