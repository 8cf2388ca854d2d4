use nodefault_core::{CoreError, FaultKind};
use thiserror::Error;

/// The single failure signal a scenario invocation produces.
///
/// Callers get the scenario, node and a rendered cause; the error taxonomy
/// behind the cause stays in the log trail.
#[derive(Debug, Clone, Error)]
#[error("{fault_kind} injection failed for node {node} on iteration {iteration}: {cause}")]
pub struct ScenarioError {
    pub fault_kind: FaultKind,
    pub node: String,
    pub iteration: u32,
    pub cause: String,
}

impl ScenarioError {
    pub fn new(fault_kind: FaultKind, node: impl Into<String>, iteration: u32, cause: &CoreError) -> Self {
        Self {
            fault_kind,
            node: node.into(),
            iteration,
            cause: cause.to_string(),
        }
    }
}

pub type ScenarioResult<T> = std::result::Result<T, ScenarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_error_message() {
        let err = ScenarioError::new(
            FaultKind::Terminate,
            "worker-3",
            2,
            &CoreError::ConvergenceTimeout("Node worker-3 could not be terminated".to_string()),
        );

        assert_eq!(
            err.to_string(),
            "node_termination_scenario injection failed for node worker-3 on iteration 2: \
             Convergence timeout: Node worker-3 could not be terminated"
        );
    }

    #[test]
    fn test_scenario_error_keeps_cause_as_text() {
        let err = ScenarioError::new(
            FaultKind::Start,
            "worker-3",
            1,
            &CoreError::Resolution("worker-3".to_string()),
        );
        assert_eq!(err.cause, "No cloud instance matches node worker-3");
        assert_eq!(err.fault_kind, FaultKind::Start);
    }
}
