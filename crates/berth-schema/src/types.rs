//! Closed vocabularies shared by every layer: container types, lifecycle
//! states, command actions, deployment modes, and the container identity.
//!
//! All enums serialize as lowercase strings, matching the wire format used by
//! status subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown container type: '{0}'")]
    UnknownType(String),
    #[error("unknown action: '{0}'")]
    UnknownAction(String),
    #[error("unknown deployment mode: '{0}'")]
    UnknownMode(String),
    #[error("unknown container state: '{0}'")]
    UnknownState(String),
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire representation of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn from_wire(s: &str, ignore_case: bool) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| {
                    if ignore_case {
                        v.as_str().eq_ignore_ascii_case(s)
                    } else {
                        v.as_str() == s
                    }
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Kind of managed workload. Each kind resolves its runnable spec differently.
    ContainerType {
        Project => "project",
        DevMode => "devmode",
        DevService => "devservice",
        Internal => "internal",
    }
}

wire_enum! {
    /// Lifecycle command accepted by the dispatcher.
    Action {
        Run => "run",
        Stop => "stop",
        Pause => "pause",
        Delete => "delete",
    }
}

wire_enum! {
    /// Lifecycle phase as last reported by a backend driver.
    ContainerState {
        Created => "created",
        Running => "running",
        Restarting => "restarting",
        Paused => "paused",
        Exited => "exited",
        Removing => "removing",
        Dead => "dead",
        Unknown => "unknown",
    }
}

wire_enum! {
    /// Which backend driver set is active for the process.
    DeploymentMode {
        Local => "local",
        Cluster => "cluster",
    }
}

impl ContainerType {
    /// Actions offered to clients for a freshly created record of this type.
    pub fn default_commands(self) -> Vec<Action> {
        match self {
            ContainerType::Project | ContainerType::DevMode | ContainerType::DevService => {
                Action::ALL.to_vec()
            }
            ContainerType::Internal => Vec::new(),
        }
    }
}

/// Container types are matched exactly: `Project` or `PROJECT` is rejected.
impl FromStr for ContainerType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s, false).ok_or_else(|| SchemaError::UnknownType(s.to_owned()))
    }
}

impl FromStr for Action {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s.trim(), true).ok_or_else(|| SchemaError::UnknownAction(s.to_owned()))
    }
}

impl FromStr for ContainerState {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s.trim(), true).ok_or_else(|| SchemaError::UnknownState(s.to_owned()))
    }
}

impl ContainerState {
    /// States after which the workload no longer exists on the backend.
    pub fn is_gone(self) -> bool {
        matches!(self, ContainerState::Removing | ContainerState::Dead)
    }
}

impl FromStr for DeploymentMode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(mode) = Self::from_wire(trimmed, true) {
            return Ok(mode);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "local-engine" | "docker" | "podman" => Ok(DeploymentMode::Local),
            "cluster-orchestrator" | "kubernetes" | "k8s" => Ok(DeploymentMode::Cluster),
            _ => Err(SchemaError::UnknownMode(s.to_owned())),
        }
    }
}

/// Identity of a managed workload instance: at most one status record exists
/// per `(name, environment)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerKey {
    pub name: String,
    pub environment: String,
}

impl ContainerKey {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.environment)
    }
}
