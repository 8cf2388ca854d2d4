pub mod kubernetes;

use crate::shared::error::{ClusterError, ClusterResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

pub use kubernetes::KubeNodeRepository;

/// The "Ready" condition type for nodes
pub const CONDITION_READY: &str = "Ready";
/// Condition status values
pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Read access to cluster nodes
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Names of all registered nodes
    async fn list_node_names(&self) -> ClusterResult<Vec<String>>;

    /// Status of the node's Ready condition, `None` if the node or the
    /// condition does not exist
    async fn ready_status(&self, node: &str) -> ClusterResult<Option<String>>;
}

#[derive(Default)]
struct NodeScript {
    listings: VecDeque<Vec<String>>,
    ready: HashMap<String, VecDeque<Option<String>>>,
    list_calls: usize,
    ready_calls: usize,
    list_error: Option<String>,
}

/// Scripted in-memory node repository.
///
/// Each script advances one step per read and then repeats its last value.
#[derive(Clone, Default)]
pub struct InMemoryNodeRepository {
    script: Arc<RwLock<NodeScript>>,
}

fn advance<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> ClusterResult<std::sync::RwLockWriteGuard<'_, NodeScript>> {
        self.script
            .write()
            .map_err(|_| ClusterError::StorageError("Lock poisoned".to_string()))
    }

    /// Queue the node list returned by the next `list_node_names` call.
    pub fn with_listing(self, nodes: &[&str]) -> Self {
        if let Ok(mut script) = self.write() {
            script
                .listings
                .push_back(nodes.iter().map(ToString::to_string).collect());
        }
        self
    }

    /// Queue Ready condition statuses for `node`.
    pub fn with_ready_script(self, node: &str, statuses: &[Option<&str>]) -> Self {
        if let Ok(mut script) = self.write() {
            script.ready.insert(
                node.to_string(),
                statuses
                    .iter()
                    .map(|status| status.map(ToString::to_string))
                    .collect(),
            );
        }
        self
    }

    pub fn with_list_error(self, message: &str) -> Self {
        if let Ok(mut script) = self.write() {
            script.list_error = Some(message.to_string());
        }
        self
    }

    pub fn list_calls(&self) -> usize {
        self.script.read().map(|s| s.list_calls).unwrap_or(0)
    }

    pub fn ready_calls(&self) -> usize {
        self.script.read().map(|s| s.ready_calls).unwrap_or(0)
    }
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn list_node_names(&self) -> ClusterResult<Vec<String>> {
        let mut script = self.write()?;
        script.list_calls += 1;
        if let Some(message) = &script.list_error {
            return Err(ClusterError::Kube(message.clone()));
        }
        Ok(advance(&mut script.listings).unwrap_or_default())
    }

    async fn ready_status(&self, node: &str) -> ClusterResult<Option<String>> {
        let mut script = self.write()?;
        script.ready_calls += 1;
        Ok(script.ready.get_mut(node).and_then(advance).flatten())
    }
}
