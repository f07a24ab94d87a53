use crate::layout::StoreLayout;
use crate::{fsync_dir, StatusStore, StoreError};
use berth_schema::{ContainerKey, ContainerStatus};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// On-disk envelope: the record plus a blake3 checksum of its JSON form.
#[derive(Debug, Serialize, Deserialize)]
struct StoredStatus {
    status: ContainerStatus,
    checksum: String,
}

fn compute_checksum(status: &ContainerStatus) -> Result<String, StoreError> {
    let json = serde_json::to_string(status)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

/// Durable status store: one JSON file per container identity.
///
/// The store reports ready only after [`initialize`](Self::initialize)
/// created the layout and validated the format version.
pub struct FileStatusStore {
    layout: StoreLayout,
    ready: AtomicBool,
}

impl FileStatusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: StoreLayout::new(root),
            ready: AtomicBool::new(false),
        }
    }

    /// Create and initialize a store in one step.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(root);
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        self.layout.initialize()?;
        self.ready.store(true, Ordering::SeqCst);
        debug!("status store ready at {}", self.layout.root().display());
        Ok(())
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StoreError::NotReady)
        }
    }

    fn read_record(path: &Path, label: &str) -> Result<ContainerStatus, StoreError> {
        let content = fs::read_to_string(path)?;
        let stored: StoredStatus = serde_json::from_str(&content)?;
        let actual = compute_checksum(&stored.status)?;
        if actual != stored.checksum {
            return Err(StoreError::IntegrityFailure {
                key: label.to_owned(),
                expected: stored.checksum,
                actual,
            });
        }
        Ok(stored.status)
    }
}

impl StatusStore for FileStatusStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn get(&self, key: &ContainerKey) -> Result<Option<ContainerStatus>, StoreError> {
        self.ensure_ready()?;
        let path = self.layout.record_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path, &key.to_string()).map(Some)
    }

    fn list(&self) -> Result<Vec<ContainerStatus>, StoreError> {
        self.ensure_ready()?;
        let mut results = Vec::new();
        for env_entry in fs::read_dir(self.layout.status_dir())? {
            let env_entry = env_entry?;
            if !env_entry.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(env_entry.path())? {
                let entry = entry?;
                let path = entry.path();
                let is_record = entry.file_type()?.is_file()
                    && path.extension().is_some_and(|ext| ext == "json");
                if !is_record {
                    continue;
                }
                let label = path.display().to_string();
                match Self::read_record(&path, &label) {
                    Ok(status) => results.push(status),
                    Err(e) => warn!("skipping corrupted status record '{label}': {e}"),
                }
            }
        }
        results.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(results)
    }

    fn list_by_environment(&self, environment: &str) -> Result<Vec<ContainerStatus>, StoreError> {
        self.ensure_ready()?;
        if crate::validate_record_name(environment).is_err() {
            return Ok(Vec::new());
        }
        let dir = self.layout.environment_dir(environment);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if !(entry.file_type()?.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            {
                continue;
            }
            let label = path.display().to_string();
            match Self::read_record(&path, &label) {
                Ok(status) => results.push(status),
                Err(e) => warn!("skipping corrupted status record '{label}': {e}"),
            }
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    fn upsert(&self, status: &ContainerStatus) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let key = status.key();
        let dest = self.layout.record_path(&key)?;
        let dir = self.layout.environment_dir(&key.environment);
        fs::create_dir_all(&dir)?;

        let stored = StoredStatus {
            status: status.clone(),
            checksum: compute_checksum(status)?,
        };
        let content = serde_json::to_string_pretty(&stored)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;
        Ok(())
    }

    fn remove(&self, key: &ContainerKey) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let path = self.layout.record_path(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
