use crate::types::DeploymentMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "BERTH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How the deployment mode is chosen at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    #[default]
    Auto,
    Local,
    Cluster,
}

impl ModeSetting {
    /// The fixed mode, or `None` when it must be detected.
    pub fn fixed(self) -> Option<DeploymentMode> {
        match self {
            ModeSetting::Auto => None,
            ModeSetting::Local => Some(DeploymentMode::Local),
            ModeSetting::Cluster => Some(DeploymentMode::Cluster),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Docker-compatible CLI (`docker`, `podman`), or `mock`.
    #[serde(default = "default_engine_binary")]
    pub binary: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSection {
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            kubectl: default_kubectl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BerthConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub mode: ModeSetting,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub prune_deleted: bool,
    #[serde(default = "default_pending_timeout")]
    pub pending_timeout_secs: u64,
    #[serde(default)]
    pub definitions: Option<PathBuf>,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub cluster: ClusterSection,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            mode: ModeSetting::Auto,
            namespace: default_namespace(),
            prune_deleted: false,
            pending_timeout_secs: default_pending_timeout(),
            definitions: None,
            store: StoreSection::default(),
            engine: EngineSection::default(),
            cluster: ClusterSection::default(),
        }
    }
}

impl BerthConfig {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load from `explicit`, else from `$BERTH_CONFIG`, else use defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.trim().is_empty() {
            return Err(ConfigError::Invalid("environment must not be empty".to_owned()));
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".to_owned()));
        }
        if self.pending_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pending_timeout_secs must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_environment() -> String {
    "dev".to_owned()
}

fn default_namespace() -> String {
    "berth".to_owned()
}

fn default_pending_timeout() -> u64 {
    300
}

fn default_store_path() -> String {
    "~/.local/share/berth".to_owned()
}

fn default_engine_binary() -> String {
    "docker".to_owned()
}

fn default_kubectl() -> String {
    "kubectl".to_owned()
}
