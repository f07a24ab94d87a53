use crate::CoreError;
use berth_schema::ContainerKey;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use tracing::debug;

/// Per-identity mutual exclusion.
///
/// Holders of different keys never contend; a second holder of the same key
/// blocks until the first guard is dropped.
#[derive(Default)]
pub struct KeyedLocks {
    held: Mutex<HashSet<ContainerKey>>,
    released: Condvar,
}

pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: ContainerKey,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, key: &ContainerKey) -> Result<KeyGuard<'_>, CoreError> {
        let mut held = self.held.lock().map_err(|_| CoreError::LockPoisoned)?;
        while held.contains(key) {
            debug!("waiting for lock on {key}");
            held = self
                .released
                .wait(held)
                .map_err(|_| CoreError::LockPoisoned)?;
        }
        held.insert(key.clone());
        Ok(KeyGuard {
            locks: self,
            key: key.clone(),
        })
    }

    pub fn try_acquire(&self, key: &ContainerKey) -> Result<Option<KeyGuard<'_>>, CoreError> {
        let mut held = self.held.lock().map_err(|_| CoreError::LockPoisoned)?;
        if !held.insert(key.clone()) {
            return Ok(None);
        }
        Ok(Some(KeyGuard {
            locks: self,
            key: key.clone(),
        }))
    }

    pub fn is_held(&self, key: &ContainerKey) -> bool {
        self.held.lock().is_ok_and(|held| held.contains(key))
    }
}

impl KeyGuard<'_> {
    pub fn key(&self) -> &ContainerKey {
        &self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        held.remove(&self.key);
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn acquire_and_release() {
        let locks = KeyedLocks::new();
        let key = ContainerKey::new("orders", "dev");
        {
            let guard = locks.acquire(&key).unwrap();
            assert_eq!(guard.key(), &key);
            assert!(locks.is_held(&key));
        }
        assert!(!locks.is_held(&key));
    }

    #[test]
    fn try_acquire_returns_none_when_held() {
        let locks = KeyedLocks::new();
        let key = ContainerKey::new("orders", "dev");
        let _guard = locks.acquire(&key).unwrap();
        assert!(locks.try_acquire(&key).unwrap().is_none());
    }

    #[test]
    fn distinct_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire(&ContainerKey::new("orders", "dev")).unwrap();
        let b = locks.try_acquire(&ContainerKey::new("orders", "prod")).unwrap();
        assert!(b.is_some());
    }

    #[test]
    fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let key = ContainerKey::new("orders", "dev");

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _guard = locks.acquire(&key).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    std::thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
        assert!(!locks.is_held(&key));
    }
}
