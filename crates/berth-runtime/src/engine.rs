use crate::backend::{ContainerBackend, LABEL_NAME, LABEL_TYPE};
use crate::process::{probe, run_cli};
use crate::RuntimeError;
use berth_schema::{ContainerSpec, ContainerType, DeploymentMode};
use std::path::Path;
use tracing::info;

/// Local container engine driven through a Docker-compatible CLI.
pub struct EngineBackend {
    binary: String,
    name: String,
}

impl Default for EngineBackend {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl EngineBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        let name = Path::new(&binary)
            .file_name()
            .map_or_else(|| binary.clone(), |n| n.to_string_lossy().into_owned());
        Self { binary, name }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Arguments for `<engine> create`, in a stable order.
    pub fn create_args(
        spec: &ContainerSpec,
        container_type: ContainerType,
    ) -> Result<Vec<String>, RuntimeError> {
        let ports = spec
            .port_mappings()
            .map_err(|e| RuntimeError::InvalidSpec(e.to_string()))?;

        let mut args = vec![
            "create".to_owned(),
            "--name".to_owned(),
            spec.container_name.clone(),
            "--label".to_owned(),
            format!("{LABEL_TYPE}={container_type}"),
            "--label".to_owned(),
            format!("{LABEL_NAME}={}", spec.container_name),
        ];
        for (k, v) in &spec.labels {
            args.push("--label".to_owned());
            args.push(format!("{k}={v}"));
        }
        for port in ports {
            args.push("--publish".to_owned());
            args.push(format!("{}:{}", port.host, port.container));
        }
        for (k, v) in &spec.environment {
            args.push("--env".to_owned());
            args.push(format!("{k}={v}"));
        }
        if let Some(restart) = &spec.restart {
            args.push("--restart".to_owned());
            args.push(restart.clone());
        }
        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());
        Ok(args)
    }

    fn exec(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let owned: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        run_cli(&self.binary, &owned, None)
    }
}

impl ContainerBackend for EngineBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> DeploymentMode {
        DeploymentMode::Local
    }

    fn available(&self) -> bool {
        probe(&self.binary, &["version"])
    }

    fn create(
        &self,
        spec: &ContainerSpec,
        container_type: ContainerType,
    ) -> Result<(), RuntimeError> {
        let args = Self::create_args(spec, container_type)?;
        let id = run_cli(&self.binary, &args, None)?;
        info!(
            "created {container_type} container {} ({})",
            spec.container_name,
            id.trim()
        );
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&["start", name]).map(|_| ())
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&["stop", name]).map(|_| ())
    }

    fn pause(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&["pause", name]).map(|_| ())
    }

    fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&["rm", "--force", name]).map(|_| ())
    }
}
