use crate::shared::error::{ScenarioError, ScenarioResult};
use nodefault_cluster::ClusterConvergenceWaiter;
use nodefault_core::{
    CloudTarget, ClusterCondition, CoreError, FaultKind, FaultOutcome, Result, ScenarioRequest,
};
use nodefault_gcp::{InstanceController, InstanceDirectory};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_ABSENCE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runs resolve, act, cloud wait and cluster wait for every iteration of a
/// fault scenario. The first failing iteration ends the invocation.
pub struct ScenarioOrchestrator {
    directory: InstanceDirectory,
    controller: InstanceController,
    cluster: Arc<dyn ClusterConvergenceWaiter>,
    absence_poll_interval: Duration,
}

impl ScenarioOrchestrator {
    pub fn new(
        directory: InstanceDirectory,
        controller: InstanceController,
        cluster: Arc<dyn ClusterConvergenceWaiter>,
    ) -> Self {
        Self {
            directory,
            controller,
            cluster,
            absence_poll_interval: DEFAULT_ABSENCE_POLL_INTERVAL,
        }
    }

    pub fn with_absence_poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.absence_poll_interval = interval;
        }
        self
    }

    pub async fn run(
        &self,
        fault_kind: FaultKind,
        request: &ScenarioRequest,
    ) -> ScenarioResult<FaultOutcome> {
        let mut outcome = FaultOutcome::begin(fault_kind, &request.node_name);

        for iteration in 1..=request.iteration_count {
            if let Err(e) = self
                .run_iteration(fault_kind, request, iteration, &mut outcome)
                .await
            {
                error!(
                    scenario = %fault_kind,
                    node = %request.node_name,
                    iteration,
                    error = %e,
                    "Fault injection failed. Test Failed"
                );
                return Err(ScenarioError::new(
                    fault_kind,
                    &request.node_name,
                    iteration,
                    &e,
                ));
            }
            outcome.iterations_completed = iteration;
        }

        Ok(outcome.finish())
    }

    async fn run_iteration(
        &self,
        fault_kind: FaultKind,
        request: &ScenarioRequest,
        iteration: u32,
        outcome: &mut FaultOutcome,
    ) -> Result<()> {
        let plan = fault_kind.plan();
        let node = request.node_name.as_str();
        let timeout = request.timeout();

        info!(scenario = %fault_kind, %node, iteration, "Starting injection");

        let identity = self
            .directory
            .resolve_instance(node)
            .await?
            .ok_or_else(|| CoreError::Resolution(node.to_string()))?;

        info!(
            %node,
            instance = %identity.name,
            zone = %identity.zone,
            action = %plan.action,
            "Injecting fault into node instance"
        );
        self.controller.perform(plan.action, &identity).await?;

        if let CloudTarget::Status(target) = plan.cloud_target {
            if self
                .controller
                .wait_for_status(&identity, target, timeout)
                .await?
            {
                info!(instance = %identity.name, status = %target, "Node instance converged");
            } else {
                warn!(
                    instance = %identity.name,
                    status = %target,
                    "Cloud status did not converge, continuing with cluster checks"
                );
                outcome.cloud_timeouts.push(iteration);
            }
        }

        match plan.cluster_condition {
            ClusterCondition::Ready => {
                if !self.cluster.wait_for_ready(node, timeout).await? {
                    outcome.cluster_timeouts.push(iteration);
                }
            }
            ClusterCondition::NotReady => {
                if !self.cluster.wait_for_not_ready(node, timeout).await? {
                    outcome.cluster_timeouts.push(iteration);
                }
            }
            ClusterCondition::Absent => {
                self.wait_for_absence(node, timeout).await?;
                info!(%node, instance = %identity.name, "Node has been terminated");
            }
        }

        info!(scenario = %fault_kind, %node, iteration, "Injection completed successfully");
        Ok(())
    }

    /// Poll the node list until `timeout` worth of sleep has accumulated,
    /// then check once more. A node still listed after that is fatal.
    async fn wait_for_absence(&self, node: &str, timeout: Duration) -> Result<()> {
        let mut elapsed = Duration::ZERO;

        while elapsed < timeout {
            if !self.node_listed(node).await? {
                return Ok(());
            }
            tokio::time::sleep(self.absence_poll_interval).await;
            elapsed += self.absence_poll_interval;
        }

        if self.node_listed(node).await? {
            error!(%node, timeout_secs = timeout.as_secs(), "Node could not be terminated");
            return Err(CoreError::ConvergenceTimeout(format!(
                "Node {node} could not be terminated"
            )));
        }
        Ok(())
    }

    async fn node_listed(&self, node: &str) -> Result<bool> {
        Ok(self.cluster.list_nodes().await?.iter().any(|n| n == node))
    }
}
