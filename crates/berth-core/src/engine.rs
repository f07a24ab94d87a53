use crate::bus::{status_topic, EventBus, STATUS_TOPIC};
use crate::concurrency::KeyedLocks;
use crate::context::Context;
use crate::CoreError;
use berth_schema::{
    Action, ContainerKey, ContainerState, ContainerStatus, ContainerType, StatusReport, Transit,
};
use berth_store::StatusStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type StatusBus = EventBus<ContainerStatus>;

/// Single writer of container status records.
///
/// Every mutation runs under a per-identity lock spanning
/// read-modify-upsert-publish, so subscribers of one container observe its
/// records in the order they were written. Distinct identities proceed in
/// parallel.
pub struct StatusEngine {
    ctx: Arc<Context>,
    store: Arc<dyn StatusStore>,
    bus: Arc<StatusBus>,
    locks: KeyedLocks,
}

impl StatusEngine {
    pub fn new(ctx: Arc<Context>, store: Arc<dyn StatusStore>, bus: Arc<StatusBus>) -> Self {
        Self {
            ctx,
            store,
            bus,
            locks: KeyedLocks::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<StatusBus> {
        &self.bus
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    fn ensure_ready(&self) -> Result<(), CoreError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(CoreError::NotReady)
        }
    }

    /// Record that `action` was accepted for `key` and announce it.
    ///
    /// A name seen for the first time gets the default record for its type.
    pub fn mark_in_transit(
        &self,
        key: &ContainerKey,
        container_type: ContainerType,
        action: Action,
    ) -> Result<ContainerStatus, CoreError> {
        self.ensure_ready()?;
        let _guard = self.locks.acquire(key)?;

        let mut status = self.store.get(key)?.unwrap_or_else(|| {
            debug!("no record for {key}; creating default {container_type} record");
            ContainerStatus::create_by_type(&key.name, &key.environment, container_type)
        });
        status.mark_pending(action, Utc::now());
        self.store.upsert(&status)?;
        self.publish(&status);
        Ok(status)
    }

    /// Settle a record from an asynchronous backend report.
    ///
    /// Returns the final record. When pruning is enabled and the report shows
    /// a deleted container going away, the record is published one last time
    /// and then removed from the store.
    pub fn apply_report(&self, report: &StatusReport) -> Result<ContainerStatus, CoreError> {
        self.ensure_ready()?;
        let key = report.key();
        let _guard = self.locks.acquire(&key)?;

        let mut status = match self.store.get(&key)? {
            Some(status) => status,
            None => {
                debug!("report for unseen container {key}");
                ContainerStatus::create_by_type(
                    &report.name,
                    &report.environment,
                    report.container_type,
                )
            }
        };
        let deleting = matches!(
            status.transit,
            Transit::Pending {
                action: Action::Delete,
                ..
            }
        );
        status.apply_report(report, Utc::now());

        if self.ctx.prune_deleted && deleting && report.state.is_gone() {
            self.publish(&status);
            self.store.remove(&key)?;
            info!("pruned record for deleted container {key}");
        } else {
            self.store.upsert(&status)?;
            self.publish(&status);
        }
        Ok(status)
    }

    pub fn get(&self, key: &ContainerKey) -> Result<Option<ContainerStatus>, CoreError> {
        self.ensure_ready()?;
        Ok(self.store.get(key)?)
    }

    /// Records currently awaiting a backend report.
    pub fn pending(&self) -> Result<Vec<ContainerStatus>, CoreError> {
        self.ensure_ready()?;
        let mut pending: Vec<ContainerStatus> = self
            .store
            .list()?
            .into_iter()
            .filter(ContainerStatus::in_transit)
            .collect();
        pending.sort_by_key(ContainerStatus::pending_since);
        Ok(pending)
    }

    /// Settle every record pending for longer than `max_age` with state
    /// `unknown`. Returns the keys that were expired.
    pub fn expire_pending(&self, max_age: Duration) -> Result<Vec<ContainerKey>, CoreError> {
        let now = Utc::now();
        let cutoff = cutoff(now, max_age);
        let mut expired = Vec::new();

        for candidate in self.pending()? {
            let key = candidate.key();
            let _guard = self.locks.acquire(&key)?;

            // Re-read under the lock; a report may have settled it meanwhile.
            let Some(mut status) = self.store.get(&key)? else {
                continue;
            };
            match status.pending_since() {
                Some(since) if since <= cutoff => {}
                _ => continue,
            }
            status.state = ContainerState::Unknown;
            status.settle(now);
            self.store.upsert(&status)?;
            self.publish(&status);
            warn!("no report for {key} within {}s; marked unknown", max_age.as_secs());
            expired.push(key);
        }
        Ok(expired)
    }

    fn publish(&self, status: &ContainerStatus) {
        let all = self.bus.publish(STATUS_TOPIC, status.clone());
        let named = self.bus.publish(
            &status_topic(&status.name, &status.environment),
            status.clone(),
        );
        debug!(
            "published {} ({}) to {all} + {named} subscriber(s)",
            status.key(),
            status.state
        );
    }
}

fn cutoff(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::DeploymentMode;
    use berth_store::MemoryStatusStore;

    fn engine_with(ctx: Context, store: Arc<MemoryStatusStore>) -> StatusEngine {
        StatusEngine::new(Arc::new(ctx), store, Arc::new(StatusBus::new()))
    }

    fn engine() -> (StatusEngine, Arc<MemoryStatusStore>) {
        let store = Arc::new(MemoryStatusStore::new());
        let engine = engine_with(Context::new("dev", DeploymentMode::Local), Arc::clone(&store));
        (engine, store)
    }

    #[test]
    fn mark_in_transit_creates_default_record() {
        let (engine, store) = engine();
        let key = ContainerKey::new("orders", "dev");

        let status = engine
            .mark_in_transit(&key, ContainerType::Project, Action::Run)
            .unwrap();
        assert!(status.in_transit());
        assert_eq!(status.project_id, "orders");
        assert_eq!(status.state, ContainerState::Unknown);
        assert_eq!(store.get(&key).unwrap(), Some(status));
    }

    #[test]
    fn mark_in_transit_publishes_on_both_topics() {
        let (engine, _store) = engine();
        let mut all = engine.bus().subscribe(STATUS_TOPIC);
        let mut named = engine.bus().subscribe(&status_topic("orders", "dev"));
        let mut other = engine.bus().subscribe(&status_topic("billing", "dev"));

        engine
            .mark_in_transit(
                &ContainerKey::new("orders", "dev"),
                ContainerType::Project,
                Action::Stop,
            )
            .unwrap();

        assert_eq!(all.drain().len(), 1);
        let published = named.drain();
        assert_eq!(published.len(), 1);
        assert!(matches!(
            published[0].transit,
            Transit::Pending {
                action: Action::Stop,
                ..
            }
        ));
        assert!(other.drain().is_empty());
    }

    #[test]
    fn existing_record_keeps_its_fields() {
        let (engine, store) = engine();
        let mut existing = ContainerStatus::create_by_type("orders", "dev", ContainerType::Project);
        existing.image = Some("orders:1".to_owned());
        existing.state = ContainerState::Running;
        store.upsert(&existing).unwrap();

        let status = engine
            .mark_in_transit(&existing.key(), ContainerType::Project, Action::Pause)
            .unwrap();
        assert_eq!(status.image.as_deref(), Some("orders:1"));
        assert_eq!(status.state, ContainerState::Running);
        assert!(status.in_transit());
    }

    #[test]
    fn not_ready_store_is_rejected() {
        let store = Arc::new(MemoryStatusStore::not_ready());
        let engine = engine_with(Context::new("dev", DeploymentMode::Local), store);
        let result = engine.mark_in_transit(
            &ContainerKey::new("orders", "dev"),
            ContainerType::Project,
            Action::Run,
        );
        assert!(matches!(result, Err(CoreError::NotReady)));
    }

    #[test]
    fn report_settles_pending_record() {
        let (engine, _store) = engine();
        let key = ContainerKey::new("orders", "dev");
        engine
            .mark_in_transit(&key, ContainerType::Project, Action::Run)
            .unwrap();

        let mut report =
            StatusReport::new("orders", "dev", ContainerType::Project, ContainerState::Running);
        report.container_id = Some("abc123".to_owned());
        let status = engine.apply_report(&report).unwrap();

        assert!(!status.in_transit());
        assert_eq!(status.state, ContainerState::Running);
        assert_eq!(status.container_id.as_deref(), Some("abc123"));
        assert!(engine.pending().unwrap().is_empty());
    }

    #[test]
    fn report_for_unseen_container_creates_record() {
        let (engine, store) = engine();
        let report =
            StatusReport::new("pg", "dev", ContainerType::DevService, ContainerState::Running);
        engine.apply_report(&report).unwrap();
        let stored = store.get(&report.key()).unwrap().unwrap();
        assert_eq!(stored.container_type, ContainerType::DevService);
        assert!(!stored.in_transit());
    }

    #[test]
    fn deleted_record_is_pruned_when_enabled() {
        let store = Arc::new(MemoryStatusStore::new());
        let ctx = Context::new("dev", DeploymentMode::Local).with_prune_deleted(true);
        let engine = engine_with(ctx, Arc::clone(&store));
        let key = ContainerKey::new("orders", "dev");
        let mut sub = engine.bus().subscribe(&status_topic("orders", "dev"));

        engine
            .mark_in_transit(&key, ContainerType::Project, Action::Delete)
            .unwrap();
        let report =
            StatusReport::new("orders", "dev", ContainerType::Project, ContainerState::Dead);
        engine.apply_report(&report).unwrap();

        assert!(store.get(&key).unwrap().is_none());
        let published = sub.drain();
        assert_eq!(published.len(), 2);
        assert_eq!(published[1].state, ContainerState::Dead);
    }

    #[test]
    fn deleted_record_is_kept_by_default() {
        let (engine, store) = engine();
        let key = ContainerKey::new("orders", "dev");
        engine
            .mark_in_transit(&key, ContainerType::Project, Action::Delete)
            .unwrap();
        let report =
            StatusReport::new("orders", "dev", ContainerType::Project, ContainerState::Removing);
        engine.apply_report(&report).unwrap();
        assert_eq!(
            store.get(&key).unwrap().map(|s| s.state),
            Some(ContainerState::Removing)
        );
    }

    #[test]
    fn crashed_container_is_not_pruned() {
        let store = Arc::new(MemoryStatusStore::new());
        let ctx = Context::new("dev", DeploymentMode::Local).with_prune_deleted(true);
        let engine = engine_with(ctx, Arc::clone(&store));
        let report =
            StatusReport::new("orders", "dev", ContainerType::Project, ContainerState::Dead);
        engine.apply_report(&report).unwrap();
        assert!(store.get(&report.key()).unwrap().is_some());
    }

    #[test]
    fn expire_pending_settles_stale_records() {
        let (engine, store) = engine();
        let stale = ContainerKey::new("orders", "dev");
        engine
            .mark_in_transit(&stale, ContainerType::Project, Action::Run)
            .unwrap();

        assert!(engine
            .expire_pending(Duration::from_secs(3600))
            .unwrap()
            .is_empty());

        let expired = engine.expire_pending(Duration::ZERO).unwrap();
        assert_eq!(expired, vec![stale.clone()]);
        let status = store.get(&stale).unwrap().unwrap();
        assert!(!status.in_transit());
        assert_eq!(status.state, ContainerState::Unknown);
    }

    #[test]
    fn cutoff_saturates() {
        let now = Utc::now();
        assert_eq!(cutoff(now, Duration::ZERO), now);
        assert_eq!(cutoff(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
