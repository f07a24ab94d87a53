//! Backend drivers for Berth container workloads.
//!
//! This crate implements the execution layer the control plane dispatches to:
//! the `ContainerBackend` trait, the local engine driver (Docker-compatible
//! CLI), the cluster driver (`kubectl` against a namespace), a recording
//! `MockBackend`, deployment mode detection, the `BackendRegistry` keyed by
//! mode, and prerequisite checks for the driver binaries.

pub mod backend;
pub mod cluster;
pub mod engine;
pub mod mock;
pub mod prereq;
mod process;

pub use backend::{detect_mode, BackendRegistry, ContainerBackend, LABEL_NAME, LABEL_TYPE};
pub use cluster::ClusterBackend;
pub use engine::EngineBackend;
pub use mock::{BackendCall, MockBackend, Operation};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no backend available for deployment mode '{0}'")]
    BackendUnavailable(String),
    #[error("`{command}` failed{}: {stderr}", exit_suffix(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },
    #[error("container '{0}' not found")]
    NotFound(String),
    #[error("invalid container spec: {0}")]
    InvalidSpec(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("injected failure: {0}")]
    Injected(String),
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {c}"))
        .unwrap_or_default()
}
