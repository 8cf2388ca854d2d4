use crate::{CoreError, InstanceStatus, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single lifecycle request sent to the cloud provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Stop,
    Suspend,
    Delete,
    Reset,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Suspend => "suspend",
            LifecycleAction::Delete => "delete",
            LifecycleAction::Reset => "reset",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the cloud side is expected to converge to after the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudTarget {
    Status(InstanceStatus),
    Skip,
}

/// What the cluster side is expected to converge to after the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterCondition {
    /// Ready condition is "True".
    Ready,
    /// Ready condition is "False" or "Unknown".
    NotReady,
    /// Node no longer listed. Gates success.
    Absent,
}

/// Everything that differs between fault kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultPlan {
    pub action: LifecycleAction,
    pub cloud_target: CloudTarget,
    pub cluster_condition: ClusterCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Start,
    Stop,
    Terminate,
    Reboot,
}

impl FaultKind {
    pub const ALL: [FaultKind; 4] = [
        FaultKind::Start,
        FaultKind::Stop,
        FaultKind::Terminate,
        FaultKind::Reboot,
    ];

    pub fn scenario_name(&self) -> &'static str {
        match self {
            FaultKind::Start => "node_start_scenario",
            FaultKind::Stop => "node_stop_scenario",
            FaultKind::Terminate => "node_termination_scenario",
            FaultKind::Reboot => "node_reboot_scenario",
        }
    }

    /// Stop converges to TERMINATED, not a distinct stopped status: Compute
    /// Engine moves a stopped instance from STOPPING straight to TERMINATED.
    pub fn plan(&self) -> FaultPlan {
        match self {
            FaultKind::Start => FaultPlan {
                action: LifecycleAction::Start,
                cloud_target: CloudTarget::Status(InstanceStatus::Running),
                cluster_condition: ClusterCondition::Ready,
            },
            FaultKind::Stop => FaultPlan {
                action: LifecycleAction::Stop,
                cloud_target: CloudTarget::Status(InstanceStatus::Terminated),
                cluster_condition: ClusterCondition::NotReady,
            },
            FaultKind::Terminate => FaultPlan {
                action: LifecycleAction::Delete,
                cloud_target: CloudTarget::Status(InstanceStatus::Terminated),
                cluster_condition: ClusterCondition::Absent,
            },
            FaultKind::Reboot => FaultPlan {
                action: LifecycleAction::Reset,
                cloud_target: CloudTarget::Skip,
                cluster_condition: ClusterCondition::Ready,
            },
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scenario_name())
    }
}

impl FromStr for FaultKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        FaultKind::ALL
            .into_iter()
            .find(|kind| {
                let short = match kind {
                    FaultKind::Start => "start",
                    FaultKind::Stop => "stop",
                    FaultKind::Terminate => "terminate",
                    FaultKind::Reboot => "reboot",
                };
                normalized == short || normalized == kind.scenario_name()
            })
            .ok_or_else(|| CoreError::InvalidRequest(format!("unknown fault kind '{s}'")))
    }
}
