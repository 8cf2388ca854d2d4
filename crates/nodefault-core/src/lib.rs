pub mod fault;
pub mod scenario;

pub use fault::{CloudTarget, ClusterCondition, FaultKind, FaultPlan, LifecycleAction};
pub use scenario::{FaultOutcome, ScenarioRequest};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("No cloud instance matches node {0}")]
    Resolution(String),
    #[error("Failed to {action} instance {instance}: {cause}")]
    Action {
        action: LifecycleAction,
        instance: String,
        cause: String,
    },
    #[error("Convergence timeout: {0}")]
    ConvergenceTimeout(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Compute Engine instance status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Provisioning,
    Staging,
    Running,
    Stopping,
    Suspending,
    Suspended,
    Repairing,
    Terminated,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Provisioning => "PROVISIONING",
            InstanceStatus::Staging => "STAGING",
            InstanceStatus::Running => "RUNNING",
            InstanceStatus::Stopping => "STOPPING",
            InstanceStatus::Suspending => "SUSPENDING",
            InstanceStatus::Suspended => "SUSPENDED",
            InstanceStatus::Repairing => "REPAIRING",
            InstanceStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PROVISIONING" => Ok(InstanceStatus::Provisioning),
            "STAGING" => Ok(InstanceStatus::Staging),
            "RUNNING" => Ok(InstanceStatus::Running),
            "STOPPING" => Ok(InstanceStatus::Stopping),
            "SUSPENDING" => Ok(InstanceStatus::Suspending),
            "SUSPENDED" => Ok(InstanceStatus::Suspended),
            "REPAIRING" => Ok(InstanceStatus::Repairing),
            "TERMINATED" => Ok(InstanceStatus::Terminated),
            other => Err(CoreError::Transport(format!(
                "unknown instance status '{other}'"
            ))),
        }
    }
}

/// Cloud-side identity of the virtual machine backing a cluster node.
///
/// Resolved again on every iteration; a previous iteration may have
/// deleted or replaced the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdentity {
    pub name: String,
    pub zone: String,
}

impl InstanceIdentity {
    pub fn new(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
        }
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone, self.name)
    }
}
