use crate::backend::ContainerBackend;
use crate::RuntimeError;
use berth_schema::{ContainerSpec, ContainerState, ContainerType, DeploymentMode};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Start,
    Stop,
    Pause,
    Delete,
}

/// One driver invocation, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub operation: Operation,
    pub name: String,
}

#[derive(Default)]
struct MockState {
    calls: Vec<BackendCall>,
    failing: HashSet<Operation>,
    containers: HashMap<String, ContainerState>,
}

/// In-memory driver that records calls and tracks container states.
pub struct MockBackend {
    mode: DeploymentMode,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            mode,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Make every subsequent `operation` fail.
    pub fn fail_on(&self, operation: Operation) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(operation);
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().map(|s| s.calls.len()).unwrap_or(0)
    }

    pub fn container_state(&self, name: &str) -> Option<ContainerState> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.containers.get(name).copied())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::Injected(format!("mutex poisoned: {e}")))
    }

    fn record(
        &self,
        operation: Operation,
        name: &str,
    ) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(BackendCall {
            operation,
            name: name.to_owned(),
        });
        if state.failing.contains(&operation) {
            return Err(RuntimeError::Injected(format!("{operation:?} {name}")));
        }
        Ok(state)
    }

    fn transition(
        &self,
        operation: Operation,
        name: &str,
        to: ContainerState,
    ) -> Result<(), RuntimeError> {
        let mut state = self.record(operation, name)?;
        match state.containers.get_mut(name) {
            Some(current) => {
                *current = to;
                Ok(())
            }
            None => Err(RuntimeError::NotFound(name.to_owned())),
        }
    }
}

impl ContainerBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn mode(&self) -> DeploymentMode {
        self.mode
    }

    fn available(&self) -> bool {
        true
    }

    fn create(
        &self,
        spec: &ContainerSpec,
        _container_type: ContainerType,
    ) -> Result<(), RuntimeError> {
        let mut state = self.record(Operation::Create, &spec.container_name)?;
        state
            .containers
            .insert(spec.container_name.clone(), ContainerState::Created);
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.transition(Operation::Start, name, ContainerState::Running)
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.transition(Operation::Stop, name, ContainerState::Exited)
    }

    fn pause(&self, name: &str) -> Result<(), RuntimeError> {
        self.transition(Operation::Pause, name, ContainerState::Paused)
    }

    fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.record(Operation::Delete, name)?;
        state.containers.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_lifecycle() {
        let backend = MockBackend::new(DeploymentMode::Local);
        let spec = ContainerSpec::new("orders", "orders:1");

        backend.run(&spec, ContainerType::Project).unwrap();
        assert_eq!(
            backend.container_state("orders"),
            Some(ContainerState::Running)
        );

        backend.pause("orders").unwrap();
        assert_eq!(
            backend.container_state("orders"),
            Some(ContainerState::Paused)
        );

        backend.stop("orders").unwrap();
        backend.delete("orders").unwrap();
        assert_eq!(backend.container_state("orders"), None);

        let ops: Vec<Operation> = backend.calls().iter().map(|c| c.operation).collect();
        assert_eq!(
            ops,
            vec![
                Operation::Create,
                Operation::Start,
                Operation::Pause,
                Operation::Stop,
                Operation::Delete
            ]
        );
    }

    #[test]
    fn unknown_container_is_not_found() {
        let backend = MockBackend::new(DeploymentMode::Local);
        assert!(matches!(
            backend.stop("ghost"),
            Err(RuntimeError::NotFound(_))
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn injected_failures_are_recorded() {
        let backend = MockBackend::new(DeploymentMode::Cluster);
        backend.fail_on(Operation::Delete);
        assert!(matches!(
            backend.delete("orders"),
            Err(RuntimeError::Injected(_))
        ));
        assert_eq!(
            backend.calls(),
            vec![BackendCall {
                operation: Operation::Delete,
                name: "orders".to_owned()
            }]
        );
    }

    #[test]
    fn delete_of_unknown_container_succeeds() {
        let backend = MockBackend::new(DeploymentMode::Local);
        assert!(backend.delete("ghost").is_ok());
    }
}
