pub mod features;
pub mod shared;

pub use features::nodes::repo::{InMemoryNodeRepository, KubeNodeRepository, NodeRepository};
pub use features::nodes::service::NodeConditionWaiter;
pub use shared::error::{ClusterError, ClusterResult};

use async_trait::async_trait;
use nodefault_core::Result;
use std::time::Duration;

/// Cluster-side convergence checks consumed by the scenario orchestrator.
///
/// The wait methods return `Ok(false)` when the timeout elapses; `Err` is
/// reserved for failures talking to the cluster.
#[async_trait]
pub trait ClusterConvergenceWaiter: Send + Sync {
    /// Names of the nodes currently registered
    async fn list_nodes(&self) -> Result<Vec<String>>;

    /// Wait for the Ready condition to become "True"
    async fn wait_for_ready(&self, node: &str, timeout: Duration) -> Result<bool>;

    /// Wait for the Ready condition to become "False" or "Unknown"
    async fn wait_for_not_ready(&self, node: &str, timeout: Duration) -> Result<bool>;
}
