use crate::backend::{ContainerBackend, LABEL_NAME, LABEL_TYPE};
use crate::process::{probe, run_cli};
use crate::RuntimeError;
use berth_schema::{ContainerSpec, ContainerType, DeploymentMode};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

/// Cluster orchestrator driven through `kubectl`, scoped to one namespace.
///
/// Workloads are bare pods. Pods cannot be suspended, so `pause` is
/// unsupported; `stop` removes the pod without waiting for termination.
pub struct ClusterBackend {
    kubectl: String,
    name: String,
    namespace: String,
}

impl ClusterBackend {
    pub fn new(kubectl: impl Into<String>, namespace: impl Into<String>) -> Self {
        let kubectl = kubectl.into();
        let name = Path::new(&kubectl)
            .file_name()
            .map_or_else(|| kubectl.clone(), |n| n.to_string_lossy().into_owned());
        Self {
            kubectl,
            name,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Pod manifest applied for `spec`.
    pub fn pod_manifest(
        &self,
        spec: &ContainerSpec,
        container_type: ContainerType,
    ) -> Result<Value, RuntimeError> {
        let ports: Vec<Value> = spec
            .port_mappings()
            .map_err(|e| RuntimeError::InvalidSpec(e.to_string()))?
            .into_iter()
            .map(|p| json!({ "containerPort": p.container }))
            .collect();
        let env: Vec<Value> = spec
            .environment
            .iter()
            .map(|(k, v)| json!({ "name": k, "value": v }))
            .collect();

        let mut labels = serde_json::Map::new();
        for (k, v) in &spec.labels {
            labels.insert(k.clone(), Value::String(v.clone()));
        }
        labels.insert(
            LABEL_TYPE.to_owned(),
            Value::String(container_type.to_string()),
        );
        labels.insert(
            LABEL_NAME.to_owned(),
            Value::String(spec.container_name.clone()),
        );

        let mut container = json!({
            "name": spec.container_name,
            "image": spec.image,
            "ports": ports,
            "env": env,
        });
        if !spec.command.is_empty() {
            container["args"] = json!(spec.command);
        }

        Ok(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": spec.container_name,
                "namespace": self.namespace,
                "labels": labels,
            },
            "spec": {
                "restartPolicy": restart_policy(spec.restart.as_deref()),
                "containers": [container],
            },
        }))
    }

    /// Namespaced pod delete; a pod that is already gone is not an error.
    pub fn delete_pod(&self, name: &str, namespace: &str) -> Result<(), RuntimeError> {
        self.kubectl(&[
            "delete",
            "pod",
            name,
            "--namespace",
            namespace,
            "--ignore-not-found",
        ])
        .map(|_| ())
    }

    fn kubectl(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let owned: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        run_cli(&self.kubectl, &owned, None)
    }
}

fn restart_policy(restart: Option<&str>) -> &'static str {
    match restart {
        Some("no" | "never") => "Never",
        Some("on-failure") => "OnFailure",
        _ => "Always",
    }
}

impl ContainerBackend for ClusterBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> DeploymentMode {
        DeploymentMode::Cluster
    }

    fn available(&self) -> bool {
        probe(&self.kubectl, &["version", "--client"])
    }

    fn create(
        &self,
        spec: &ContainerSpec,
        container_type: ContainerType,
    ) -> Result<(), RuntimeError> {
        let manifest = serde_json::to_vec(&self.pod_manifest(spec, container_type)?)?;
        let args: Vec<String> = ["apply", "--namespace", self.namespace.as_str(), "-f", "-"]
            .iter()
            .map(|a| (*a).to_owned())
            .collect();
        run_cli(&self.kubectl, &args, Some(&manifest))?;
        info!(
            "applied pod {} in namespace {}",
            spec.container_name, self.namespace
        );
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        debug!("pod {name} starts on apply; nothing to do");
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.kubectl(&[
            "delete",
            "pod",
            name,
            "--namespace",
            self.namespace.as_str(),
            "--wait=false",
            "--ignore-not-found",
        ])
        .map(|_| ())
    }

    fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        self.delete_pod(name, &self.namespace)
    }
}
