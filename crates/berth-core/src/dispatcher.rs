use crate::concurrency::KeyedLocks;
use crate::engine::StatusEngine;
use crate::CoreError;
use berth_runtime::{BackendRegistry, ContainerBackend};
use berth_schema::{Action, CommandRequest, ContainerKey, ContainerSpec, ContainerType, Definitions};
use berth_store::StoreError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a command that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The command was recorded and, where applicable, handed to the backend.
    Accepted,
    /// Nothing was done.
    Unchanged,
}

/// Resolves a container name to a runnable spec.
///
/// `Ok(None)` means there is nothing to run under that name.
pub trait SpecBuilder: Send + Sync {
    fn build(&self, name: &str) -> Result<Option<ContainerSpec>, CoreError>;
}

impl<F> SpecBuilder for F
where
    F: Fn(&str) -> Result<Option<ContainerSpec>, CoreError> + Send + Sync,
{
    fn build(&self, name: &str) -> Result<Option<ContainerSpec>, CoreError> {
        self(name)
    }
}

/// Spec lookup in a loaded definitions file.
pub struct DefinitionsSpecBuilder {
    definitions: Arc<Definitions>,
    dev_services: bool,
}

impl DefinitionsSpecBuilder {
    pub fn projects(definitions: Arc<Definitions>) -> Self {
        Self {
            definitions,
            dev_services: false,
        }
    }

    pub fn dev_services(definitions: Arc<Definitions>) -> Self {
        Self {
            definitions,
            dev_services: true,
        }
    }
}

impl SpecBuilder for DefinitionsSpecBuilder {
    fn build(&self, name: &str) -> Result<Option<ContainerSpec>, CoreError> {
        let spec = if self.dev_services {
            self.definitions.dev_service(name)
        } else {
            self.definitions.project(name)
        };
        Ok(spec.cloned())
    }
}

/// Spec builders by container type.
#[derive(Clone)]
pub struct SpecBuilders {
    project: Arc<dyn SpecBuilder>,
    dev_service: Arc<dyn SpecBuilder>,
}

fn nothing(_: &str) -> Result<Option<ContainerSpec>, CoreError> {
    Ok(None)
}

impl Default for SpecBuilders {
    fn default() -> Self {
        Self::new(Arc::new(nothing), Arc::new(nothing))
    }
}

impl SpecBuilders {
    pub fn new(project: Arc<dyn SpecBuilder>, dev_service: Arc<dyn SpecBuilder>) -> Self {
        Self {
            project,
            dev_service,
        }
    }

    pub fn from_definitions(definitions: Definitions) -> Self {
        let definitions = Arc::new(definitions);
        Self::new(
            Arc::new(DefinitionsSpecBuilder::projects(Arc::clone(&definitions))),
            Arc::new(DefinitionsSpecBuilder::dev_services(definitions)),
        )
    }

    /// Builder responsible for `container_type`, or `None` when running that
    /// type is deferred.
    pub fn for_type(&self, container_type: ContainerType) -> Option<&dyn SpecBuilder> {
        match container_type {
            ContainerType::Project => Some(self.project.as_ref()),
            ContainerType::DevService => Some(self.dev_service.as_ref()),
            ContainerType::DevMode | ContainerType::Internal => None,
        }
    }
}

/// Accepts lifecycle commands and fans them out to the active backend.
pub struct Dispatcher {
    engine: Arc<StatusEngine>,
    registry: BackendRegistry,
    builders: SpecBuilders,
    locks: KeyedLocks,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<StatusEngine>,
        registry: BackendRegistry,
        builders: SpecBuilders,
    ) -> Self {
        Self {
            engine,
            registry,
            builders,
            locks: KeyedLocks::new(),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Apply `request` to container `name` of `container_type` in
    /// `environment`.
    ///
    /// The status record is marked in transit and published before the
    /// backend is called. Backend failures are returned as errors; the record
    /// stays pending until a report or the watchdog settles it.
    pub fn dispatch(
        &self,
        environment: &str,
        container_type: ContainerType,
        name: &str,
        request: &CommandRequest,
    ) -> Result<Outcome, CoreError> {
        if !self.engine.is_ready() {
            warn!("status store not ready; ignoring command for {name}@{environment}");
            return Ok(Outcome::Unchanged);
        }
        let Some(action) = request.action() else {
            warn!(
                "unrecognized command {:?} for {name}@{environment}",
                request.command
            );
            return Ok(Outcome::Unchanged);
        };

        let key = ContainerKey::new(name, environment);
        let _guard = self.locks.acquire(&key)?;
        if !self.mark_in_transit(&key, container_type, action)? {
            return Ok(Outcome::Unchanged);
        }

        let backend = self.registry.active()?;
        match action {
            Action::Run => return self.run(backend.as_ref(), container_type, name),
            Action::Stop => backend.stop(name)?,
            Action::Pause => backend.pause(name)?,
            Action::Delete => backend.delete(name)?,
        }
        info!("{action} {container_type} {key} via {}", backend.name());
        Ok(Outcome::Accepted)
    }

    /// False when the store stopped being ready after the first check.
    fn mark_in_transit(
        &self,
        key: &ContainerKey,
        container_type: ContainerType,
        action: Action,
    ) -> Result<bool, CoreError> {
        match self.engine.mark_in_transit(key, container_type, action) {
            Ok(_) => Ok(true),
            Err(CoreError::NotReady | CoreError::Store(StoreError::NotReady)) => {
                warn!("status store went away; ignoring {action} for {key}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn run(
        &self,
        backend: &dyn ContainerBackend,
        container_type: ContainerType,
        name: &str,
    ) -> Result<Outcome, CoreError> {
        let Some(builder) = self.builders.for_type(container_type) else {
            info!("running {container_type} containers is deferred; {name} left pending");
            return Ok(Outcome::Accepted);
        };
        let Some(spec) = builder.build(name)? else {
            info!("no {container_type} definition for {name}; nothing to run");
            return Ok(Outcome::Accepted);
        };
        backend.run(&spec, container_type)?;
        info!(
            "run {container_type} {name} ({}) via {}",
            spec.image,
            backend.name()
        );
        Ok(Outcome::Accepted)
    }

    /// Deletion flow: like `dispatch` with a `delete` command, except that a
    /// backend failure is logged and reported as `Unchanged`.
    pub fn delete(
        &self,
        environment: &str,
        container_type: ContainerType,
        name: &str,
    ) -> Result<Outcome, CoreError> {
        if !self.engine.is_ready() {
            warn!("status store not ready; ignoring delete of {name}@{environment}");
            return Ok(Outcome::Unchanged);
        }

        let key = ContainerKey::new(name, environment);
        let _guard = self.locks.acquire(&key)?;
        if !self.mark_in_transit(&key, container_type, Action::Delete)? {
            return Ok(Outcome::Unchanged);
        }

        let result = self
            .registry
            .active()
            .and_then(|backend| backend.delete(name));
        match result {
            Ok(()) => {
                info!("delete {container_type} {key} accepted");
                Ok(Outcome::Accepted)
            }
            Err(e) => {
                error!("failed to delete {container_type} {key}: {e}");
                Ok(Outcome::Unchanged)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::parse_definitions_str;

    #[test]
    fn for_type_is_exhaustive() {
        let builders = SpecBuilders::default();
        assert!(builders.for_type(ContainerType::Project).is_some());
        assert!(builders.for_type(ContainerType::DevService).is_some());
        assert!(builders.for_type(ContainerType::DevMode).is_none());
        assert!(builders.for_type(ContainerType::Internal).is_none());
    }

    #[test]
    fn definitions_builder_looks_up_by_kind() {
        let defs = parse_definitions_str(
            r#"
[projects.orders]
image = "orders:1"

[devservices.pg]
image = "postgres:16"
"#,
        )
        .unwrap();
        let builders = SpecBuilders::from_definitions(defs);

        let project = builders.for_type(ContainerType::Project).unwrap();
        assert_eq!(project.build("orders").unwrap().unwrap().image, "orders:1");
        assert!(project.build("pg").unwrap().is_none());

        let service = builders.for_type(ContainerType::DevService).unwrap();
        assert_eq!(service.build("pg").unwrap().unwrap().container_name, "pg");
    }

    #[test]
    fn closures_are_builders() {
        let builder = |name: &str| -> Result<Option<ContainerSpec>, CoreError> {
            Ok(Some(ContainerSpec::new(name, "busybox")))
        };
        let spec = SpecBuilder::build(&builder, "tool").unwrap().unwrap();
        assert_eq!(spec.container_name, "tool");
    }
}
