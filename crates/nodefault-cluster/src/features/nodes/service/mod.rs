use crate::features::nodes::repo::{NodeRepository, STATUS_FALSE, STATUS_TRUE, STATUS_UNKNOWN};
use crate::ClusterConvergenceWaiter;
use async_trait::async_trait;
use nodefault_core::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_CONDITION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls node Ready conditions until they match or the timeout runs out.
pub struct NodeConditionWaiter {
    repo: Arc<dyn NodeRepository>,
    poll_interval: Duration,
}

impl NodeConditionWaiter {
    pub fn new(repo: Arc<dyn NodeRepository>) -> Self {
        Self {
            repo,
            poll_interval: DEFAULT_CONDITION_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        if !poll_interval.is_zero() {
            self.poll_interval = poll_interval;
        }
        self
    }

    async fn wait_for_ready_status(
        &self,
        node: &str,
        accepted: &[&str],
        timeout: Duration,
    ) -> Result<bool> {
        let mut elapsed = Duration::ZERO;

        while elapsed <= timeout {
            let status = self.repo.ready_status(node).await?;
            if let Some(status) = status.as_deref() {
                if accepted.contains(&status) {
                    info!(%node, ready = %status, "Node reached expected Ready status");
                    return Ok(true);
                }
            }

            tokio::time::sleep(self.poll_interval).await;
            elapsed += self.poll_interval;
        }

        warn!(
            %node,
            expected = ?accepted,
            timeout_secs = timeout.as_secs(),
            "Node did not reach expected Ready status in time"
        );
        Ok(false)
    }
}

#[async_trait]
impl ClusterConvergenceWaiter for NodeConditionWaiter {
    async fn list_nodes(&self) -> Result<Vec<String>> {
        Ok(self.repo.list_node_names().await?)
    }

    async fn wait_for_ready(&self, node: &str, timeout: Duration) -> Result<bool> {
        self.wait_for_ready_status(node, &[STATUS_TRUE], timeout)
            .await
    }

    async fn wait_for_not_ready(&self, node: &str, timeout: Duration) -> Result<bool> {
        self.wait_for_ready_status(node, &[STATUS_FALSE, STATUS_UNKNOWN], timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::nodes::repo::InMemoryNodeRepository;
    use nodefault_core::CoreError;
    use tokio::time::Instant;

    fn waiter(repo: &InMemoryNodeRepository) -> NodeConditionWaiter {
        NodeConditionWaiter::new(Arc::new(repo.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready() {
        let repo = InMemoryNodeRepository::new().with_ready_script(
            "worker-3",
            &[Some("Unknown"), Some("False"), Some("True")],
        );
        let started = Instant::now();

        assert!(waiter(&repo)
            .wait_for_ready("worker-3", Duration::from_secs(30))
            .await
            .unwrap());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_not_ready_accepts_unknown() {
        let repo = InMemoryNodeRepository::new()
            .with_ready_script("worker-3", &[Some("True"), Some("Unknown")]);

        assert!(waiter(&repo)
            .wait_for_not_ready("worker-3", Duration::from_secs(10))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_not_ready_accepts_false() {
        let repo =
            InMemoryNodeRepository::new().with_ready_script("worker-3", &[Some("False")]);

        assert!(waiter(&repo)
            .wait_for_not_ready("worker-3", Duration::from_secs(10))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_error() {
        let repo = InMemoryNodeRepository::new().with_ready_script("worker-3", &[Some("True")]);
        let started = Instant::now();

        let converged = waiter(&repo)
            .wait_for_not_ready("worker-3", Duration::from_secs(3))
            .await
            .unwrap();

        assert!(!converged);
        assert_eq!(repo.ready_calls(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_node_never_ready() {
        let repo = InMemoryNodeRepository::new();

        assert!(!waiter(&repo)
            .wait_for_ready("worker-3", Duration::from_secs(2))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_nodes_error_is_transport() {
        let repo = InMemoryNodeRepository::new().with_list_error("forbidden");

        let err = waiter(&repo).list_nodes().await.unwrap_err();
        assert!(matches!(err, CoreError::Transport(_)));
    }
}
