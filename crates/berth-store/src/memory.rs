use crate::{StatusStore, StoreError};
use berth_schema::{ContainerKey, ContainerStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-process status store. Starts ready unless built with [`not_ready`](Self::not_ready).
pub struct MemoryStatusStore {
    records: RwLock<HashMap<ContainerKey, ContainerStatus>>,
    ready: AtomicBool,
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(true),
        }
    }
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn not_ready() -> Self {
        let store = Self::default();
        store.set_ready(false);
        store
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

impl StatusStore for MemoryStatusStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn get(&self, key: &ContainerKey) -> Result<Option<ContainerStatus>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(key).cloned())
    }

    fn list(&self) -> Result<Vec<ContainerStatus>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut all: Vec<ContainerStatus> = records.values().cloned().collect();
        all.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(all)
    }

    fn upsert(&self, status: &ContainerStatus) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(status.key(), status.clone());
        Ok(())
    }

    fn remove(&self, key: &ContainerKey) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::{ContainerState, ContainerType};

    #[test]
    fn readiness_toggle() {
        let store = MemoryStatusStore::not_ready();
        assert!(!store.is_ready());
        store.set_ready(true);
        assert!(store.is_ready());
    }

    #[test]
    fn one_record_per_identity() {
        let store = MemoryStatusStore::new();
        let mut status = ContainerStatus::create_by_type("orders", "dev", ContainerType::Project);
        store.upsert(&status).unwrap();
        status.state = ContainerState::Paused;
        store.upsert(&status).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&status.key()).unwrap().unwrap().state,
            ContainerState::Paused
        );
    }

    #[test]
    fn project_filter_scopes_to_environment() {
        let store = MemoryStatusStore::new();
        let mut dev = ContainerStatus::create_by_type("orders", "dev", ContainerType::Project);
        dev.project_id = "shop".to_owned();
        let mut prod = ContainerStatus::create_by_type("orders", "prod", ContainerType::Project);
        prod.project_id = "shop".to_owned();
        store.upsert(&dev).unwrap();
        store.upsert(&prod).unwrap();

        let found = store.list_by_project("shop", "dev").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].environment, "dev");
        assert_eq!(store.list_by_type(ContainerType::Project).unwrap().len(), 2);
    }

    #[test]
    fn remove_drops_record() {
        let store = MemoryStatusStore::new();
        let status = ContainerStatus::create_by_type("pg", "dev", ContainerType::DevService);
        store.upsert(&status).unwrap();
        store.remove(&status.key()).unwrap();
        assert!(store.is_empty());
    }
}
