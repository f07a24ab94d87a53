use berth_schema::DeploymentMode;
use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    if name.contains('/') {
        return std::path::Path::new(name).is_file();
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check that the driver binary for `mode` is installed.
///
/// `binary` is the engine CLI in local mode and the kubectl path in cluster
/// mode. The in-memory `mock` driver has no prerequisites.
pub fn check_prereqs(mode: DeploymentMode, binary: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if binary == "mock" || command_exists(binary) {
        return missing;
    }

    match mode {
        DeploymentMode::Local => missing.push(MissingPrereq {
            name: binary.to_owned(),
            purpose: "local container engine",
            install_hint:
                "zypper install docker | apt install docker.io | dnf install podman | pacman -S docker",
        }),
        DeploymentMode::Cluster => missing.push(MissingPrereq {
            name: binary.to_owned(),
            purpose: "cluster orchestrator client",
            install_hint: "https://kubernetes.io/docs/tasks/tools/",
        }),
    }
    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nBerth requires these tools to manage containers.");
    msg
}
