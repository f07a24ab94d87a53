//! Status store for Berth container records.
//!
//! This crate provides the storage layer consumed by the control plane: the
//! `StatusStore` capability (keyed by `ContainerKey`, with a readiness probe),
//! `MemoryStatusStore` for tests and ephemeral deployments, and
//! `FileStatusStore`, a durable store writing one checksummed JSON record per
//! container through atomic renames.

pub mod file;
pub mod layout;
pub mod memory;

pub use file::FileStatusStore;
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use memory::MemoryStatusStore;

use berth_schema::{ContainerKey, ContainerStatus, ContainerType};
use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is not ready")]
    NotReady,
    #[error("integrity check failed for record '{key}': expected {expected}, got {actual}")]
    IntegrityFailure {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid record name: {0}")]
    InvalidName(String),
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Durable mapping from container identity to its status record.
///
/// Implementations must accept concurrent upserts for different keys.
pub trait StatusStore: Send + Sync {
    fn is_ready(&self) -> bool;

    fn get(&self, key: &ContainerKey) -> Result<Option<ContainerStatus>, StoreError>;

    fn list(&self) -> Result<Vec<ContainerStatus>, StoreError>;

    fn upsert(&self, status: &ContainerStatus) -> Result<(), StoreError>;

    fn remove(&self, key: &ContainerKey) -> Result<(), StoreError>;

    fn list_by_environment(&self, environment: &str) -> Result<Vec<ContainerStatus>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|s| s.environment == environment)
            .collect())
    }

    fn list_by_project(
        &self,
        project_id: &str,
        environment: &str,
    ) -> Result<Vec<ContainerStatus>, StoreError> {
        Ok(self
            .list_by_environment(environment)?
            .into_iter()
            .filter(|s| s.project_id == project_id)
            .collect())
    }

    fn list_by_type(
        &self,
        container_type: ContainerType,
    ) -> Result<Vec<ContainerStatus>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|s| s.container_type == container_type)
            .collect())
    }
}

/// Record names end up in file paths: `[a-zA-Z0-9_.-]`, 1-128 characters,
/// no leading dot.
pub fn validate_record_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.len() > 128 {
        return Err(StoreError::InvalidName(format!(
            "'{name}' must be 1-128 characters"
        )));
    }
    if name.starts_with('.') {
        return Err(StoreError::InvalidName(format!(
            "'{name}' must not start with '.'"
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(StoreError::InvalidName(format!(
            "'{name}' must match [a-zA-Z0-9_.-]"
        )));
    }
    Ok(())
}
