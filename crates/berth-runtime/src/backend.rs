use crate::RuntimeError;
use berth_schema::{BerthConfig, ContainerSpec, ContainerType, DeploymentMode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Label carrying the container type on every workload a driver creates.
pub const LABEL_TYPE: &str = "berth.dev/type";
/// Label carrying the logical container name.
pub const LABEL_NAME: &str = "berth.dev/name";

/// Variable injected into the pod environment of every cluster deployment.
const CLUSTER_ENV_VAR: &str = "KUBERNETES_SERVICE_HOST";

pub trait ContainerBackend: Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> DeploymentMode;

    fn available(&self) -> bool;

    /// Create (but do not start) a workload from `spec`.
    fn create(&self, spec: &ContainerSpec, container_type: ContainerType)
        -> Result<(), RuntimeError>;

    fn start(&self, name: &str) -> Result<(), RuntimeError>;

    fn run(&self, spec: &ContainerSpec, container_type: ContainerType) -> Result<(), RuntimeError> {
        self.create(spec, container_type)?;
        self.start(&spec.container_name)
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    fn pause(&self, _name: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::Unsupported {
            backend: self.name().to_owned(),
            operation: "pause",
        })
    }

    fn delete(&self, name: &str) -> Result<(), RuntimeError>;
}

/// Mode of the current process: cluster when running inside a pod.
pub fn detect_mode() -> DeploymentMode {
    if std::env::var_os(CLUSTER_ENV_VAR).is_some() {
        DeploymentMode::Cluster
    } else {
        DeploymentMode::Local
    }
}

/// Capability lookup from deployment mode to the driver serving it.
///
/// The active mode is fixed at construction; callers never branch on it.
#[derive(Clone)]
pub struct BackendRegistry {
    mode: DeploymentMode,
    backends: HashMap<DeploymentMode, Arc<dyn ContainerBackend>>,
}

impl BackendRegistry {
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            mode,
            backends: HashMap::new(),
        }
    }

    /// Register `backend` under the mode it reports, replacing any previous one.
    #[must_use]
    pub fn with(mut self, backend: Arc<dyn ContainerBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn register(&mut self, backend: Arc<dyn ContainerBackend>) {
        debug!(
            "registering {} backend for {} mode",
            backend.name(),
            backend.mode()
        );
        self.backends.insert(backend.mode(), backend);
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn get(&self, mode: DeploymentMode) -> Option<Arc<dyn ContainerBackend>> {
        self.backends.get(&mode).cloned()
    }

    pub fn active(&self) -> Result<Arc<dyn ContainerBackend>, RuntimeError> {
        self.get(self.mode)
            .ok_or_else(|| RuntimeError::BackendUnavailable(self.mode.to_string()))
    }

    /// Build the driver set described by `config`.
    ///
    /// `mock` as the engine binary or kubectl path selects the in-memory driver.
    pub fn from_config(config: &BerthConfig, mode: DeploymentMode) -> Self {
        let local: Arc<dyn ContainerBackend> = match config.engine.binary.as_str() {
            "mock" => Arc::new(crate::mock::MockBackend::new(DeploymentMode::Local)),
            binary => Arc::new(crate::engine::EngineBackend::new(binary)),
        };
        let cluster: Arc<dyn ContainerBackend> = match config.cluster.kubectl.as_str() {
            "mock" => Arc::new(crate::mock::MockBackend::new(DeploymentMode::Cluster)),
            kubectl => Arc::new(crate::cluster::ClusterBackend::new(
                kubectl,
                &config.namespace,
            )),
        };
        Self::new(mode).with(local).with(cluster)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<(DeploymentMode, &str)> = self
            .backends
            .iter()
            .map(|(mode, b)| (*mode, b.name()))
            .collect();
        names.sort();
        f.debug_struct("BackendRegistry")
            .field("mode", &self.mode)
            .field("backends", &names)
            .finish()
    }
}
