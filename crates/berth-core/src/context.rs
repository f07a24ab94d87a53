use berth_runtime::detect_mode;
use berth_schema::{BerthConfig, DeploymentMode};
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "berth";
const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(300);

/// Immutable settings shared by every control plane component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Environment used when a caller does not name one.
    pub environment: String,
    pub mode: DeploymentMode,
    /// Cluster namespace workloads and log topics are scoped to.
    pub namespace: String,
    /// Drop records once a deleted container reports `removing` or `dead`.
    pub prune_deleted: bool,
    /// Age after which the watchdog settles a pending record as `unknown`.
    pub pending_timeout: Duration,
}

impl Context {
    pub fn new(environment: impl Into<String>, mode: DeploymentMode) -> Self {
        Self {
            environment: environment.into(),
            mode,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            prune_deleted: false,
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
        }
    }

    /// `mode = "auto"` is resolved here, once.
    pub fn from_config(config: &BerthConfig) -> Self {
        Self {
            environment: config.environment.clone(),
            mode: config.mode.fixed().unwrap_or_else(detect_mode),
            namespace: config.namespace.clone(),
            prune_deleted: config.prune_deleted,
            pending_timeout: Duration::from_secs(config.pending_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_prune_deleted(mut self, prune: bool) -> Self {
        self.prune_deleted = prune;
        self
    }

    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// Second half of a log topic: the namespace in cluster mode, else the
    /// environment.
    pub fn log_discriminator<'a>(&'a self, environment: &'a str) -> &'a str {
        match self.mode {
            DeploymentMode::Cluster => &self.namespace,
            DeploymentMode::Local => environment,
        }
    }
}
