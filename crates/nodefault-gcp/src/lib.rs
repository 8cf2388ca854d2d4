pub mod auth;
pub mod features;
pub mod shared;

pub use auth::GcpCredentials;
pub use features::instances::controller::InstanceController;
pub use features::instances::repo::{ComputeRepository, InMemoryComputeRepository, ListedInstance};
pub use features::instances::service::InstanceDirectory;
pub use features::instances::GceInstances;
pub use shared::error::{ComputeError, ComputeResult};
