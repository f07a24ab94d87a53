use crate::definitions::DefinitionsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runnable description of a container, handed to a backend driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    #[serde(default)]
    pub container_name: String,
    pub image: String,
    /// `"<host>:<container>"` or a single port published on both sides.
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub restart: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl ContainerSpec {
    pub fn new(container_name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionsError> {
        if self.container_name.trim().is_empty() {
            return Err(DefinitionsError::EmptyContainerName);
        }
        if self.image.trim().is_empty() {
            return Err(DefinitionsError::EmptyImage(self.container_name.clone()));
        }
        self.port_mappings()?;
        Ok(())
    }

    pub fn port_mappings(&self) -> Result<Vec<PortMapping>, DefinitionsError> {
        self.ports
            .iter()
            .map(|p| parse_port(&self.container_name, p))
            .collect()
    }
}

fn parse_port(service: &str, spec: &str) -> Result<PortMapping, DefinitionsError> {
    let invalid = || DefinitionsError::InvalidPort {
        service: service.to_owned(),
        spec: spec.to_owned(),
    };
    let (host, container) = match spec.trim().split_once(':') {
        Some((h, c)) => (h.trim(), c.trim()),
        None => (spec.trim(), spec.trim()),
    };
    let host = host.parse::<u16>().map_err(|_| invalid())?;
    let container = container.parse::<u16>().map_err(|_| invalid())?;
    if host == 0 || container == 0 {
        return Err(invalid());
    }
    Ok(PortMapping { host, container })
}
