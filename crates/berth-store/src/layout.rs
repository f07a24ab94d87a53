use crate::{validate_record_name, StoreError};
use berth_schema::ContainerKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current store format version. Incremented on incompatible layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;
const VERSION_FILE: &str = "version";

/// Directory layout of a file-backed status store.
///
/// Records live at `<root>/status/<environment>/<name>.json`.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreVersion {
    format_version: u32,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn status_dir(&self) -> PathBuf {
        self.root.join("status")
    }

    #[inline]
    pub fn environment_dir(&self, environment: &str) -> PathBuf {
        self.status_dir().join(environment)
    }

    pub fn record_path(&self, key: &ContainerKey) -> Result<PathBuf, StoreError> {
        validate_record_name(&key.environment)?;
        validate_record_name(&key.name)?;
        Ok(self
            .environment_dir(&key.environment)
            .join(format!("{}.json", key.name)))
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.status_dir())?;

        let version_path = self.root.join(VERSION_FILE);
        if version_path.exists() {
            self.verify_version()?;
        } else {
            let ver = StoreVersion {
                format_version: STORE_FORMAT_VERSION,
            };
            let content = serde_json::to_string_pretty(&ver)?;
            let mut tmp = NamedTempFile::new_in(&self.root)?;
            tmp.write_all(content.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&version_path)
                .map_err(|e| StoreError::Io(e.error))?;
            crate::fsync_dir(&self.root)?;
        }

        Ok(())
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let content = fs::read_to_string(self.root.join(VERSION_FILE))?;
        let ver: StoreVersion = serde_json::from_str(&content)?;

        if ver.format_version != STORE_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: ver.format_version,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = StoreLayout::new("/tmp/berth-test");
        assert_eq!(layout.status_dir(), PathBuf::from("/tmp/berth-test/status"));
        assert_eq!(
            layout
                .record_path(&ContainerKey::new("orders", "dev"))
                .unwrap(),
            PathBuf::from("/tmp/berth-test/status/dev/orders.json")
        );
    }

    #[test]
    fn record_path_rejects_traversal() {
        let layout = StoreLayout::new("/tmp/berth-test");
        assert!(layout
            .record_path(&ContainerKey::new("../etc", "dev"))
            .is_err());
        assert!(layout
            .record_path(&ContainerKey::new("orders", "dev/../../"))
            .is_err());
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        layout.verify_version().unwrap();
        assert!(layout.status_dir().is_dir());
    }

    #[test]
    fn rejects_future_format() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("version"), r#"{"format_version": 99}"#).unwrap();
        let layout = StoreLayout::new(dir.path());
        assert!(matches!(
            layout.initialize(),
            Err(StoreError::VersionMismatch { found: 99, .. })
        ));
    }
}
