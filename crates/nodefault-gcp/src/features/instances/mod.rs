pub mod controller;
pub mod repo;
pub mod service;

use crate::auth::GcpCredentials;
use controller::InstanceController;
use nodefault_core::Result;
use repo::{ComputeRepository, RestComputeRepository};
use service::InstanceDirectory;
use std::sync::Arc;
use tracing::error;

/// Directory and controller sharing one Compute API repository.
pub struct GceInstances {
    pub directory: InstanceDirectory,
    pub controller: InstanceController,
}

impl GceInstances {
    /// Resolve credentials and build the REST-backed pair. Credential
    /// failures abort construction.
    pub async fn connect() -> Result<Self> {
        let credentials = GcpCredentials::resolve().await?;
        let repo = RestComputeRepository::new(credentials).map_err(|e| {
            error!(error = %e, "Error on setting up GCP connection");
            e
        })?;
        Ok(Self::with_repository(Arc::new(repo)))
    }

    pub fn with_repository(repo: Arc<dyn ComputeRepository>) -> Self {
        Self {
            directory: InstanceDirectory::new(repo.clone()),
            controller: InstanceController::new(repo),
        }
    }
}
