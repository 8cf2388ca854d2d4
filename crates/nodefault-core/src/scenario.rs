use crate::{CoreError, FaultKind, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One fault-injection invocation: repeat the fault `iteration_count` times
/// against `node_name`, bounding every wait by `timeout_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub node_name: String,
    pub iteration_count: u32,
    pub timeout_secs: u64,
}

impl ScenarioRequest {
    pub fn new(node_name: impl Into<String>, iteration_count: u32, timeout_secs: u64) -> Result<Self> {
        let node_name = node_name.into();
        if node_name.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "Node name cannot be empty".to_string(),
            ));
        }
        if iteration_count == 0 {
            return Err(CoreError::InvalidRequest(
                "Iteration count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            node_name,
            iteration_count,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Result of a successful invocation. Failures never produce one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultOutcome {
    pub fault_kind: FaultKind,
    pub node_name: String,
    pub iterations_completed: u32,
    /// Iterations (1-based) whose cloud-side wait timed out.
    pub cloud_timeouts: Vec<u32>,
    /// Iterations (1-based) whose Ready/NotReady wait timed out.
    pub cluster_timeouts: Vec<u32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FaultOutcome {
    pub fn begin(fault_kind: FaultKind, node_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            fault_kind,
            node_name: node_name.into(),
            iterations_completed: 0,
            cloud_timeouts: Vec::new(),
            cluster_timeouts: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn fully_converged(&self) -> bool {
        self.cloud_timeouts.is_empty() && self.cluster_timeouts.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::InvalidRequest(format!("failed to encode outcome: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_request_rejects_zero_iterations() {
        let err = ScenarioRequest::new("worker-3", 0, 60).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_rejects_blank_node() {
        assert!(ScenarioRequest::new("  ", 1, 60).is_err());
    }

    #[test]
    fn test_request_allows_zero_timeout() {
        let request = ScenarioRequest::new("worker-3", 2, 0).unwrap();
        assert_eq!(request.timeout(), Duration::ZERO);
        assert_eq!(request.iteration_count, 2);
    }

    #[test]
    fn test_outcome_convergence_flags() {
        let mut outcome = FaultOutcome::begin(FaultKind::Stop, "worker-3");
        assert!(outcome.fully_converged());

        outcome.cloud_timeouts.push(1);
        assert!(!outcome.fully_converged());
    }

    #[test]
    fn test_outcome_json_contains_kind_and_node() {
        let mut outcome = FaultOutcome::begin(FaultKind::Terminate, "worker-3");
        outcome.iterations_completed = 1;
        let json = outcome.finish().to_json().unwrap();

        assert!(json.contains("\"fault_kind\":\"terminate\""));
        assert!(json.contains("\"node_name\":\"worker-3\""));
        assert!(json.contains("\"iterations_completed\":1"));
    }

    proptest! {
        #[test]
        fn property_positive_iteration_counts_are_accepted(
            count in 1u32..1000,
            timeout in 0u64..10_000,
        ) {
            let request = ScenarioRequest::new("worker-1", count, timeout).unwrap();
            prop_assert_eq!(request.iteration_count, count);
            prop_assert_eq!(request.timeout_secs, timeout);
        }
    }
}
