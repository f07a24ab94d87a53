use crate::types::{Action, ContainerKey, ContainerState, ContainerType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Two-phase transit marker.
///
/// A record is `Pending` from the moment a command is accepted until a backend
/// report (or an external watchdog) settles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum Transit {
    Settled,
    Pending {
        action: Action,
        since: DateTime<Utc>,
    },
}

/// Durable status record of one managed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    pub environment: String,
    pub project_id: String,
    pub container_name: String,
    #[serde(rename = "type")]
    pub container_type: ContainerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    pub state: ContainerState,
    pub transit: Transit,
    #[serde(default)]
    pub commands: Vec<Action>,
    pub updated_at: DateTime<Utc>,
}

impl ContainerStatus {
    /// Default record for a name seen for the first time.
    pub fn create_by_type(
        name: impl Into<String>,
        environment: impl Into<String>,
        container_type: ContainerType,
    ) -> Self {
        let name = name.into();
        Self {
            project_id: name.clone(),
            container_name: name.clone(),
            name,
            environment: environment.into(),
            container_type,
            container_id: None,
            image: None,
            ports: Vec::new(),
            memory_info: None,
            cpu_info: None,
            created: None,
            finished: None,
            state: ContainerState::Unknown,
            transit: Transit::Settled,
            commands: container_type.default_commands(),
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> ContainerKey {
        ContainerKey::new(&self.name, &self.environment)
    }

    pub fn in_transit(&self) -> bool {
        matches!(self.transit, Transit::Pending { .. })
    }

    pub fn pending_since(&self) -> Option<DateTime<Utc>> {
        match self.transit {
            Transit::Pending { since, .. } => Some(since),
            Transit::Settled => None,
        }
    }

    pub fn mark_pending(&mut self, action: Action, now: DateTime<Utc>) {
        self.transit = Transit::Pending { action, since: now };
        self.updated_at = now;
    }

    pub fn settle(&mut self, now: DateTime<Utc>) {
        self.transit = Transit::Settled;
        self.updated_at = now;
    }

    /// Merge a backend report into the record and settle it.
    pub fn apply_report(&mut self, report: &StatusReport, now: DateTime<Utc>) {
        self.state = report.state;
        if let Some(project_id) = &report.project_id {
            self.project_id.clone_from(project_id);
        }
        if let Some(container_name) = &report.container_name {
            self.container_name.clone_from(container_name);
        }
        if report.container_id.is_some() {
            self.container_id.clone_from(&report.container_id);
        }
        if report.image.is_some() {
            self.image.clone_from(&report.image);
        }
        if !report.ports.is_empty() {
            self.ports.clone_from(&report.ports);
        }
        if report.memory_info.is_some() {
            self.memory_info.clone_from(&report.memory_info);
        }
        if report.cpu_info.is_some() {
            self.cpu_info.clone_from(&report.cpu_info);
        }
        if report.created.is_some() {
            self.created.clone_from(&report.created);
        }
        if report.finished.is_some() {
            self.finished.clone_from(&report.finished);
        }
        self.settle(now);
    }
}

/// Asynchronous completion report from a backend driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub name: String,
    pub environment: String,
    #[serde(rename = "type")]
    pub container_type: ContainerType,
    pub state: ContainerState,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub memory_info: Option<String>,
    #[serde(default)]
    pub cpu_info: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub finished: Option<String>,
}

impl StatusReport {
    pub fn new(
        name: impl Into<String>,
        environment: impl Into<String>,
        container_type: ContainerType,
        state: ContainerState,
    ) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            container_type,
            state,
            project_id: None,
            container_name: None,
            container_id: None,
            image: None,
            ports: Vec::new(),
            memory_info: None,
            cpu_info: None,
            created: None,
            finished: None,
        }
    }

    pub fn key(&self) -> ContainerKey {
        ContainerKey::new(&self.name, &self.environment)
    }
}
