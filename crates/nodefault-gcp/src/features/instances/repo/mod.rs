pub mod rest;

use crate::shared::error::{ComputeError, ComputeResult};
use async_trait::async_trait;
use nodefault_core::{InstanceIdentity, InstanceStatus, LifecycleAction};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

pub use rest::RestComputeRepository;

/// An instance as reported by the aggregated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedInstance {
    pub name: String,
    pub zone: String,
}

impl ListedInstance {
    pub fn new(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
        }
    }

    pub fn identity(&self) -> InstanceIdentity {
        InstanceIdentity::new(self.name.clone(), self.zone.clone())
    }
}

/// Compute Engine instance API, scoped to one project
#[async_trait]
pub trait ComputeRepository: Send + Sync {
    /// Project every call is issued against
    fn project(&self) -> &str;

    /// List instances across all zones
    async fn aggregated_list(&self) -> ComputeResult<Vec<ListedInstance>>;

    /// Current status, `None` once the instance is gone
    async fn get_status(&self, zone: &str, instance: &str)
        -> ComputeResult<Option<InstanceStatus>>;

    async fn start(&self, zone: &str, instance: &str) -> ComputeResult<()>;

    async fn stop(&self, zone: &str, instance: &str) -> ComputeResult<()>;

    async fn suspend(&self, zone: &str, instance: &str) -> ComputeResult<()>;

    async fn delete(&self, zone: &str, instance: &str) -> ComputeResult<()>;

    async fn reset(&self, zone: &str, instance: &str) -> ComputeResult<()>;
}

#[derive(Default)]
struct ScriptState {
    instances: Vec<ListedInstance>,
    status_scripts: HashMap<String, VecDeque<Option<InstanceStatus>>>,
    action_failures: HashMap<LifecycleAction, (usize, String)>,
    action_calls: HashMap<LifecycleAction, usize>,
    action_log: Vec<(LifecycleAction, InstanceIdentity)>,
    status_reads: usize,
    list_error: Option<String>,
    status_error: Option<String>,
}

/// Scripted in-memory Compute API.
///
/// Status scripts are consumed one value per read; the last value sticks.
#[derive(Clone)]
pub struct InMemoryComputeRepository {
    project: String,
    state: Arc<RwLock<ScriptState>>,
}

impl InMemoryComputeRepository {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            state: Arc::new(RwLock::new(ScriptState::default())),
        }
    }

    fn write(&self) -> ComputeResult<std::sync::RwLockWriteGuard<'_, ScriptState>> {
        self.state
            .write()
            .map_err(|_| ComputeError::Http("Lock poisoned".to_string()))
    }

    fn read(&self) -> ComputeResult<std::sync::RwLockReadGuard<'_, ScriptState>> {
        self.state
            .read()
            .map_err(|_| ComputeError::Http("Lock poisoned".to_string()))
    }

    pub fn with_instance(self, name: &str, zone: &str) -> Self {
        if let Ok(mut state) = self.write() {
            state.instances.push(ListedInstance::new(name, zone));
        }
        self
    }

    pub fn with_status_script(self, name: &str, script: Vec<Option<InstanceStatus>>) -> Self {
        if let Ok(mut state) = self.write() {
            state
                .status_scripts
                .insert(name.to_string(), script.into_iter().collect());
        }
        self
    }

    /// Fail `action` from its `from_call`-th invocation onwards (1-based).
    pub fn with_action_failure(
        self,
        action: LifecycleAction,
        from_call: usize,
        message: &str,
    ) -> Self {
        if let Ok(mut state) = self.write() {
            state
                .action_failures
                .insert(action, (from_call, message.to_string()));
        }
        self
    }

    pub fn with_list_error(self, message: &str) -> Self {
        if let Ok(mut state) = self.write() {
            state.list_error = Some(message.to_string());
        }
        self
    }

    pub fn with_status_error(self, message: &str) -> Self {
        if let Ok(mut state) = self.write() {
            state.status_error = Some(message.to_string());
        }
        self
    }

    pub fn action_log(&self) -> Vec<(LifecycleAction, InstanceIdentity)> {
        self.read()
            .map(|state| state.action_log.clone())
            .unwrap_or_default()
    }

    pub fn status_reads(&self) -> usize {
        self.read().map(|state| state.status_reads).unwrap_or(0)
    }

    fn record(&self, action: LifecycleAction, zone: &str, instance: &str) -> ComputeResult<()> {
        let mut state = self.write()?;
        state
            .action_log
            .push((action, InstanceIdentity::new(instance, zone)));

        let calls = state.action_calls.entry(action).or_insert(0);
        *calls += 1;
        let calls = *calls;

        match state.action_failures.get(&action) {
            Some((from_call, message)) if calls >= *from_call => Err(ComputeError::Api {
                status: 400,
                message: message.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ComputeRepository for InMemoryComputeRepository {
    fn project(&self) -> &str {
        &self.project
    }

    async fn aggregated_list(&self) -> ComputeResult<Vec<ListedInstance>> {
        let state = self.read()?;
        if let Some(message) = &state.list_error {
            return Err(ComputeError::Http(message.clone()));
        }
        Ok(state.instances.clone())
    }

    async fn get_status(
        &self,
        _zone: &str,
        instance: &str,
    ) -> ComputeResult<Option<InstanceStatus>> {
        let mut state = self.write()?;
        state.status_reads += 1;
        if let Some(message) = &state.status_error {
            return Err(ComputeError::Http(message.clone()));
        }

        let script = state.status_scripts.get_mut(instance).ok_or_else(|| {
            ComputeError::Api {
                status: 404,
                message: format!("no status script for {instance}"),
            }
        })?;

        let status = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        };
        Ok(status)
    }

    async fn start(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.record(LifecycleAction::Start, zone, instance)
    }

    async fn stop(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.record(LifecycleAction::Stop, zone, instance)
    }

    async fn suspend(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.record(LifecycleAction::Suspend, zone, instance)
    }

    async fn delete(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.record(LifecycleAction::Delete, zone, instance)
    }

    async fn reset(&self, zone: &str, instance: &str) -> ComputeResult<()> {
        self.record(LifecycleAction::Reset, zone, instance)
    }
}
