use crate::CoreError;
use berth_schema::{ContainerStatus, ContainerType};
use berth_store::StatusStore;
use std::sync::Arc;

/// Read-only listings over the status store.
///
/// Every listing is empty while the store is not ready.
pub struct QueryService {
    store: Arc<dyn StatusStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// All records, ordered by project id.
    pub fn list_all(&self) -> Result<Vec<ContainerStatus>, CoreError> {
        if !self.store.is_ready() {
            return Ok(Vec::new());
        }
        let mut records = self.store.list()?;
        records.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        Ok(records)
    }

    /// Records of one environment, ordered by project id.
    pub fn list_by_environment(
        &self,
        environment: &str,
    ) -> Result<Vec<ContainerStatus>, CoreError> {
        if !self.store.is_ready() {
            return Ok(Vec::new());
        }
        let mut records = self.store.list_by_environment(environment)?;
        records.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        Ok(records)
    }

    /// Project containers of one project in one environment, ordered by
    /// container name.
    pub fn list_by_project_and_environment(
        &self,
        project_id: &str,
        environment: &str,
    ) -> Result<Vec<ContainerStatus>, CoreError> {
        if !self.store.is_ready() {
            return Ok(Vec::new());
        }
        let mut records: Vec<ContainerStatus> = self
            .store
            .list_by_project(project_id, environment)?
            .into_iter()
            .filter(|s| s.container_type == ContainerType::Project)
            .collect();
        records.sort_by(|a, b| a.container_name.cmp(&b.container_name));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_store::MemoryStatusStore;

    fn record(name: &str, env: &str, project: &str, kind: ContainerType) -> ContainerStatus {
        let mut status = ContainerStatus::create_by_type(name, env, kind);
        status.project_id = project.to_owned();
        status
    }

    fn seeded() -> (QueryService, Arc<MemoryStatusStore>) {
        let store = Arc::new(MemoryStatusStore::new());
        for status in [
            record("web", "dev", "shop", ContainerType::Project),
            record("api", "dev", "shop", ContainerType::Project),
            record("pg", "dev", "shop", ContainerType::DevService),
            record("billing", "dev", "accounts", ContainerType::Project),
            record("web", "prod", "shop", ContainerType::Project),
        ] {
            store.upsert(&status).unwrap();
        }
        let service = QueryService::new(Arc::clone(&store) as Arc<dyn StatusStore>);
        (service, store)
    }

    #[test]
    fn list_all_sorted_by_project() {
        let (service, _) = seeded();
        let projects: Vec<String> = service
            .list_all()
            .unwrap()
            .into_iter()
            .map(|s| s.project_id)
            .collect();
        assert_eq!(projects, vec!["accounts", "shop", "shop", "shop", "shop"]);
    }

    #[test]
    fn list_by_environment_filters_and_sorts() {
        let (service, _) = seeded();
        let records = service.list_by_environment("dev").unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].project_id, "accounts");
        assert!(records.iter().all(|s| s.environment == "dev"));
    }

    #[test]
    fn project_listing_excludes_other_types() {
        let (service, _) = seeded();
        let names: Vec<String> = service
            .list_by_project_and_environment("shop", "dev")
            .unwrap()
            .into_iter()
            .map(|s| s.container_name)
            .collect();
        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn not_ready_store_lists_nothing() {
        let (service, store) = seeded();
        store.set_ready(false);
        assert!(service.list_all().unwrap().is_empty());
        assert!(service.list_by_environment("dev").unwrap().is_empty());
        assert!(service
            .list_by_project_and_environment("shop", "dev")
            .unwrap()
            .is_empty());
    }
}
