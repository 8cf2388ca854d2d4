use crate::features::instances::repo::ComputeRepository;
use nodefault_core::{CoreError, InstanceIdentity, InstanceStatus, LifecycleAction, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Issues lifecycle requests against resolved instances and polls their status.
///
/// Actions are sent exactly once; only status polling is repeated.
pub struct InstanceController {
    repo: Arc<dyn ComputeRepository>,
    poll_interval: Duration,
}

impl InstanceController {
    pub fn new(repo: Arc<dyn ComputeRepository>) -> Self {
        Self {
            repo,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Zero is ignored; the poll loop needs a positive interval to terminate.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        if !poll_interval.is_zero() {
            self.poll_interval = poll_interval;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn project(&self) -> &str {
        self.repo.project()
    }

    pub async fn start(&self, identity: &InstanceIdentity) -> Result<()> {
        self.perform(LifecycleAction::Start, identity).await
    }

    pub async fn stop(&self, identity: &InstanceIdentity) -> Result<()> {
        self.perform(LifecycleAction::Stop, identity).await
    }

    pub async fn suspend(&self, identity: &InstanceIdentity) -> Result<()> {
        self.perform(LifecycleAction::Suspend, identity).await
    }

    pub async fn terminate(&self, identity: &InstanceIdentity) -> Result<()> {
        self.perform(LifecycleAction::Delete, identity).await
    }

    pub async fn reboot(&self, identity: &InstanceIdentity) -> Result<()> {
        self.perform(LifecycleAction::Reset, identity).await
    }

    /// Send one lifecycle request. Failures are not retried.
    pub async fn perform(&self, action: LifecycleAction, identity: &InstanceIdentity) -> Result<()> {
        let zone = identity.zone.as_str();
        let name = identity.name.as_str();

        let result = match action {
            LifecycleAction::Start => self.repo.start(zone, name).await,
            LifecycleAction::Stop => self.repo.stop(zone, name).await,
            LifecycleAction::Suspend => self.repo.suspend(zone, name).await,
            LifecycleAction::Delete => self.repo.delete(zone, name).await,
            LifecycleAction::Reset => self.repo.reset(zone, name).await,
        };

        match result {
            Ok(()) => {
                info!(instance = %name, zone = %zone, action = %action, "Instance action issued");
                Ok(())
            }
            Err(e) => {
                error!(
                    instance = %name,
                    zone = %zone,
                    action = %action,
                    error = %e,
                    "Failed to issue instance action"
                );
                Err(CoreError::Action {
                    action,
                    instance: name.to_string(),
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Poll until the instance reports `target` or `timeout` worth of sleep
    /// has accumulated.
    ///
    /// Returns `Ok(false)` on timeout. A failed status read aborts the wait
    /// with `CoreError::Transport`. An instance that has disappeared counts
    /// as `TERMINATED`.
    pub async fn wait_for_status(
        &self,
        identity: &InstanceIdentity,
        target: InstanceStatus,
        timeout: Duration,
    ) -> Result<bool> {
        let mut elapsed = Duration::ZERO;

        while elapsed <= timeout {
            let status = self
                .repo
                .get_status(&identity.zone, &identity.name)
                .await
                .map_err(|e| {
                    error!(
                        instance = %identity.name,
                        zone = %identity.zone,
                        error = %e,
                        "Failed to read instance status"
                    );
                    CoreError::Transport(e.to_string())
                })?;

            match status {
                Some(status) => {
                    info!(instance = %identity.name, %status, "Status of vm");
                    if status == target {
                        return Ok(true);
                    }
                }
                None => {
                    info!(instance = %identity.name, "Instance no longer exists");
                    if target == InstanceStatus::Terminated {
                        return Ok(true);
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
            elapsed += self.poll_interval;
        }

        error!(
            instance = %identity.name,
            expected = %target,
            timeout_secs = timeout.as_secs(),
            "Instance did not reach expected status in time"
        );
        Ok(false)
    }

    pub async fn wait_until_suspended(
        &self,
        identity: &InstanceIdentity,
        timeout: Duration,
    ) -> Result<bool> {
        self.wait_for_status(identity, InstanceStatus::Suspended, timeout)
            .await
    }

    pub async fn wait_until_running(
        &self,
        identity: &InstanceIdentity,
        timeout: Duration,
    ) -> Result<bool> {
        self.wait_for_status(identity, InstanceStatus::Running, timeout)
            .await
    }

    /// Compute Engine has no distinct stopped status; STOPPING is followed by TERMINATED.
    pub async fn wait_until_stopped(
        &self,
        identity: &InstanceIdentity,
        timeout: Duration,
    ) -> Result<bool> {
        self.wait_for_status(identity, InstanceStatus::Terminated, timeout)
            .await
    }

    pub async fn wait_until_terminated(
        &self,
        identity: &InstanceIdentity,
        timeout: Duration,
    ) -> Result<bool> {
        self.wait_for_status(identity, InstanceStatus::Terminated, timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::instances::repo::InMemoryComputeRepository;
    use tokio::time::Instant;

    fn worker() -> InstanceIdentity {
        InstanceIdentity::new("gcp-worker-3", "us-central1-a")
    }

    fn controller(repo: &InMemoryComputeRepository) -> InstanceController {
        InstanceController::new(Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn test_actions_map_to_provider_calls() {
        let repo = InMemoryComputeRepository::new("chaos-project");
        let controller = controller(&repo);
        let identity = worker();

        controller.start(&identity).await.unwrap();
        controller.stop(&identity).await.unwrap();
        controller.suspend(&identity).await.unwrap();
        controller.terminate(&identity).await.unwrap();
        controller.reboot(&identity).await.unwrap();

        let actions: Vec<LifecycleAction> =
            repo.action_log().into_iter().map(|(a, _)| a).collect();
        assert_eq!(
            actions,
            vec![
                LifecycleAction::Start,
                LifecycleAction::Stop,
                LifecycleAction::Suspend,
                LifecycleAction::Delete,
                LifecycleAction::Reset,
            ]
        );
        assert_eq!(repo.action_log()[0].1, identity);
    }

    #[tokio::test]
    async fn test_action_failure_is_not_retried() {
        let repo = InMemoryComputeRepository::new("chaos-project").with_action_failure(
            LifecycleAction::Stop,
            1,
            "instance is locked",
        );
        let controller = controller(&repo);

        let err = controller.stop(&worker()).await.unwrap_err();
        match err {
            CoreError::Action {
                action,
                instance,
                cause,
            } => {
                assert_eq!(action, LifecycleAction::Stop);
                assert_eq!(instance, "gcp-worker-3");
                assert!(cause.contains("instance is locked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.action_log().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_converges_within_timeout() {
        let repo = InMemoryComputeRepository::new("chaos-project").with_status_script(
            "gcp-worker-3",
            vec![
                Some(InstanceStatus::Stopping),
                Some(InstanceStatus::Stopping),
                Some(InstanceStatus::Terminated),
            ],
        );
        let controller = controller(&repo);
        let started = Instant::now();

        let converged = controller
            .wait_until_stopped(&worker(), Duration::from_secs(15))
            .await
            .unwrap();

        assert!(converged);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert_eq!(repo.status_reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_gives_up_after_timeout() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_status_script("gcp-worker-3", vec![Some(InstanceStatus::Stopping)]);
        let controller = controller(&repo);
        let started = Instant::now();

        let converged = controller
            .wait_until_stopped(&worker(), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!converged);
        // Reads at 0s, 5s and 10s; the loop exits once 15s of sleep exceeds 10s.
        assert_eq!(repo.status_reads(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_with_zero_timeout_reads_once() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_status_script("gcp-worker-3", vec![Some(InstanceStatus::Staging)]);
        let controller = controller(&repo);

        let converged = controller
            .wait_until_running(&worker(), Duration::ZERO)
            .await
            .unwrap();

        assert!(!converged);
        assert_eq!(repo.status_reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_status_error_aborts_immediately() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_status_error("connection reset by peer");
        let controller = controller(&repo);
        let started = Instant::now();

        let err = controller
            .wait_until_running(&worker(), Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Transport(_)));
        assert_eq!(repo.status_reads(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_instance_counts_as_terminated() {
        let repo = InMemoryComputeRepository::new("chaos-project").with_status_script(
            "gcp-worker-3",
            vec![Some(InstanceStatus::Stopping), None],
        );
        let controller = controller(&repo);

        assert!(controller
            .wait_until_terminated(&worker(), Duration::from_secs(30))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_instance_does_not_count_as_running() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_status_script("gcp-worker-3", vec![None]);
        let controller = controller(&repo);

        assert!(!controller
            .wait_until_running(&worker(), Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_waits_for_suspended() {
        let repo = InMemoryComputeRepository::new("chaos-project").with_status_script(
            "gcp-worker-3",
            vec![
                Some(InstanceStatus::Suspending),
                Some(InstanceStatus::Suspended),
            ],
        );
        let controller = controller(&repo).with_poll_interval(Duration::from_secs(1));
        let started = Instant::now();

        assert!(controller
            .wait_until_suspended(&worker(), Duration::from_secs(5))
            .await
            .unwrap());
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_poll_interval_is_ignored() {
        let repo = InMemoryComputeRepository::new("chaos-project");
        let controller = controller(&repo).with_poll_interval(Duration::ZERO);
        assert_eq!(controller.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(controller.project(), "chaos-project");
    }
}
