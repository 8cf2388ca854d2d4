use crate::features::instances::repo::ComputeRepository;
use nodefault_core::{CoreError, InstanceIdentity, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Maps cluster node names to Compute Engine instances
pub struct InstanceDirectory {
    repo: Arc<dyn ComputeRepository>,
}

impl InstanceDirectory {
    pub fn new(repo: Arc<dyn ComputeRepository>) -> Self {
        Self { repo }
    }

    /// Find the instance backing `node_name`.
    ///
    /// Matches when the instance name is a substring of the node name, so
    /// node names that wrap the instance name with a prefix or domain suffix
    /// still resolve. The first match in listing order wins; the listing
    /// order is not guaranteed stable across calls.
    pub async fn resolve_instance(&self, node_name: &str) -> Result<Option<InstanceIdentity>> {
        let instances = self.repo.aggregated_list().await.map_err(|e| {
            error!(
                node = %node_name,
                project = %self.repo.project(),
                error = %e,
                "Failed to list instances"
            );
            CoreError::Transport(e.to_string())
        })?;

        let found = instances
            .iter()
            .find(|instance| !instance.name.is_empty() && node_name.contains(&instance.name))
            .map(|instance| instance.identity());

        match &found {
            Some(identity) => {
                info!(node = %node_name, instance = %identity.name, zone = %identity.zone, "Resolved instance");
            }
            None => {
                info!(node = %node_name, project = %self.repo.project(), "No instances match node");
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::instances::repo::InMemoryComputeRepository;
    use proptest::prelude::*;

    fn directory(repo: InMemoryComputeRepository) -> InstanceDirectory {
        InstanceDirectory::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_resolve_substring_match() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_instance("gcp-master-0", "us-central1-b")
            .with_instance("gcp-worker-3", "us-central1-a");

        let identity = directory(repo)
            .resolve_instance("gcp-worker-3.c.chaos-project.internal")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(identity, InstanceIdentity::new("gcp-worker-3", "us-central1-a"));
    }

    #[tokio::test]
    async fn test_resolve_first_match_wins() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_instance("worker", "zone-a")
            .with_instance("worker-3", "zone-b");

        let identity = directory(repo)
            .resolve_instance("worker-3")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(identity.zone, "zone-a");
    }

    #[tokio::test]
    async fn test_resolve_no_match_is_absent() {
        let repo = InMemoryComputeRepository::new("chaos-project")
            .with_instance("gcp-worker-3", "us-central1-a");

        let result = directory(repo).resolve_instance("worker-3").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_resolve_listing_error_is_transport() {
        let repo = InMemoryComputeRepository::new("chaos-project").with_list_error("503");

        let err = directory(repo).resolve_instance("worker-3").await.unwrap_err();
        assert!(matches!(err, CoreError::Transport(_)));
    }

    proptest! {
        #[test]
        fn property_unmatched_nodes_resolve_to_absent(node in "[a-z]{1,12}") {
            // Instance names contain an uppercase letter, node names never do.
            let repo = InMemoryComputeRepository::new("chaos-project")
                .with_instance("Vm-1", "zone-a")
                .with_instance("Vm-2", "zone-b");
            let directory = directory(repo);

            let result = tokio_test::block_on(directory.resolve_instance(&node)).unwrap();
            prop_assert!(result.is_none());
        }
    }
}
