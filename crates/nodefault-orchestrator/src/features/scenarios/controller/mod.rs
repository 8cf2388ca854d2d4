use crate::features::scenarios::service::ScenarioOrchestrator;
use crate::shared::error::{ScenarioError, ScenarioResult};
use nodefault_core::{FaultKind, FaultOutcome, ScenarioRequest};
use std::sync::Arc;
use tracing::{error, info};

/// Entry points for the node fault scenarios
pub struct ScenarioController {
    orchestrator: Arc<ScenarioOrchestrator>,
}

impl ScenarioController {
    pub fn new(orchestrator: Arc<ScenarioOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Validate the request and delegate to the orchestrator
    pub async fn run(
        &self,
        fault_kind: FaultKind,
        instance_kill_count: u32,
        node: &str,
        timeout: u64,
    ) -> ScenarioResult<FaultOutcome> {
        info!(scenario = %fault_kind, %node, instance_kill_count, timeout, "Received scenario request");

        let request = ScenarioRequest::new(node, instance_kill_count, timeout).map_err(|e| {
            error!(scenario = %fault_kind, %node, error = %e, "Rejected scenario request");
            ScenarioError::new(fault_kind, node, 0, &e)
        })?;

        self.orchestrator.run(fault_kind, &request).await
    }

    pub async fn node_start_scenario(
        &self,
        instance_kill_count: u32,
        node: &str,
        timeout: u64,
    ) -> ScenarioResult<FaultOutcome> {
        self.run(FaultKind::Start, instance_kill_count, node, timeout)
            .await
    }

    pub async fn node_stop_scenario(
        &self,
        instance_kill_count: u32,
        node: &str,
        timeout: u64,
    ) -> ScenarioResult<FaultOutcome> {
        self.run(FaultKind::Stop, instance_kill_count, node, timeout)
            .await
    }

    pub async fn node_termination_scenario(
        &self,
        instance_kill_count: u32,
        node: &str,
        timeout: u64,
    ) -> ScenarioResult<FaultOutcome> {
        self.run(FaultKind::Terminate, instance_kill_count, node, timeout)
            .await
    }

    pub async fn node_reboot_scenario(
        &self,
        instance_kill_count: u32,
        node: &str,
        timeout: u64,
    ) -> ScenarioResult<FaultOutcome> {
        self.run(FaultKind::Reboot, instance_kill_count, node, timeout)
            .await
    }
}
