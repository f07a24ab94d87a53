use crate::spec::ContainerSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionsError {
    #[error("failed to read definitions file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse definitions: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("container_name must not be empty")]
    EmptyContainerName,
    #[error("image must not be empty for '{0}'")]
    EmptyImage(String),
    #[error("invalid port declaration for '{service}': '{spec}', expected '<host>:<container>'")]
    InvalidPort { service: String, spec: String },
}

/// Container definitions for projects and the shared dev services.
///
/// ```toml
/// [projects.orders]
/// image = "registry.local/orders:1.4"
/// ports = ["8080:8080"]
///
/// [devservices.postgres]
/// image = "postgres:16"
/// environment = { POSTGRES_PASSWORD = "dev" }
/// ```
///
/// A table's key becomes the container name unless `container_name` is set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Definitions {
    #[serde(default)]
    pub projects: BTreeMap<String, ContainerSpec>,
    #[serde(default)]
    pub devservices: BTreeMap<String, ContainerSpec>,
}

impl Definitions {
    pub fn project(&self, project_id: &str) -> Option<&ContainerSpec> {
        self.projects.get(project_id)
    }

    pub fn dev_service(&self, name: &str) -> Option<&ContainerSpec> {
        self.devservices.get(name)
    }

    fn normalize(mut self) -> Result<Self, DefinitionsError> {
        for table in [&mut self.projects, &mut self.devservices] {
            for (key, spec) in table.iter_mut() {
                if spec.container_name.trim().is_empty() {
                    spec.container_name.clone_from(key);
                }
                spec.image = spec.image.trim().to_owned();
                spec.validate()?;
            }
        }
        Ok(self)
    }
}

pub fn parse_definitions_str(input: &str) -> Result<Definitions, DefinitionsError> {
    let raw: Definitions = toml::from_str(input)?;
    raw.normalize()
}

pub fn parse_definitions_file(path: impl AsRef<Path>) -> Result<Definitions, DefinitionsError> {
    let content = fs::read_to_string(path)?;
    parse_definitions_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_projects_and_dev_services() {
        let input = r#"
[projects.orders]
image = "registry.local/orders:1.4"
ports = ["8080:8080"]

[devservices.postgres]
container_name = "berth-postgres"
image = "postgres:16"
ports = ["5432"]
environment = { POSTGRES_PASSWORD = "dev" }
"#;
        let defs = parse_definitions_str(input).expect("should parse");
        let orders = defs.project("orders").unwrap();
        assert_eq!(orders.container_name, "orders");
        assert_eq!(orders.image, "registry.local/orders:1.4");

        let pg = defs.dev_service("postgres").unwrap();
        assert_eq!(pg.container_name, "berth-postgres");
        assert_eq!(pg.environment.get("POSTGRES_PASSWORD").unwrap(), "dev");
        assert!(defs.dev_service("kafka").is_none());
    }

    #[test]
    fn empty_file_is_valid() {
        let defs = parse_definitions_str("").unwrap();
        assert!(defs.projects.is_empty());
        assert!(defs.devservices.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let input = r#"
[projects.orders]
image = "orders:1"
replicas = 3
"#;
        assert!(matches!(
            parse_definitions_str(input),
            Err(DefinitionsError::ParseToml(_))
        ));
    }

    #[test]
    fn rejects_invalid_ports() {
        let input = r#"
[devservices.redis]
image = "redis:7"
ports = ["redis"]
"#;
        assert!(matches!(
            parse_definitions_str(input),
            Err(DefinitionsError::InvalidPort { .. })
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("definitions.toml");
        std::fs::write(&path, "[projects.web]\nimage = \"web:2\"\n").unwrap();
        let defs = parse_definitions_file(&path).unwrap();
        assert_eq!(defs.project("web").unwrap().image, "web:2");
    }
}
