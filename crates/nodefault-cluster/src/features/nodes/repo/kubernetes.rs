use super::{NodeRepository, CONDITION_READY};
use crate::shared::error::{ClusterError, ClusterResult};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams};
use kube::Client;

/// Node repository backed by the Kubernetes API server.
pub struct KubeNodeRepository {
    nodes: Api<Node>,
}

impl KubeNodeRepository {
    pub fn new(client: Client) -> Self {
        Self {
            nodes: Api::all(client),
        }
    }

    /// Connect using in-cluster config or the local kubeconfig.
    pub async fn try_default() -> ClusterResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Kube(format!("failed to create client: {e}")))?;
        Ok(Self::new(client))
    }
}

/// Status string of the node's Ready condition, if reported.
pub fn ready_condition_status(node: &Node) -> Option<String> {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == CONDITION_READY)
                .map(|condition| condition.status.clone())
        })
}

#[async_trait]
impl NodeRepository for KubeNodeRepository {
    async fn list_node_names(&self) -> ClusterResult<Vec<String>> {
        let list = self.nodes.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|node| node.metadata.name)
            .collect())
    }

    async fn ready_status(&self, node: &str) -> ClusterResult<Option<String>> {
        let node = self.nodes.get_opt(node).await?;
        Ok(node.as_ref().and_then(ready_condition_status))
    }
}
