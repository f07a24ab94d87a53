//! CLI subprocess integration tests.
//!
//! These tests invoke the `berth` binary as a subprocess against the mock
//! engine driver and a temporary file store, and verify exit codes, stdout
//! content, and JSON output.

use std::path::PathBuf;
use std::process::{Command, Output};

const DEFINITIONS: &str = r#"
[projects.orders]
image = "registry.local/orders:1.4"
ports = ["18080:8080"]

[projects.billing]
image = "registry.local/billing:2.0"

[devservices.pg]
image = "postgres:16"
"#;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let definitions = dir.path().join("berth-definitions.toml");
        std::fs::write(&definitions, DEFINITIONS).unwrap();
        let config = format!(
            r#"environment = "dev"
mode = "local"
definitions = "{}"

[store]
path = "{}"

[engine]
binary = "mock"
"#,
            definitions.display(),
            dir.path().join("store").display()
        );
        std::fs::write(dir.path().join("berth.toml"), config).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("berth.toml")
    }

    fn berth(&self, args: &[&str]) -> Output {
        berth_bin()
            .arg("--config")
            .arg(self.config())
            .args(args)
            .output()
            .unwrap()
    }

    fn ps_json(&self, extra: &[&str]) -> Vec<serde_json::Value> {
        let mut args = vec!["ps", "--json"];
        args.extend_from_slice(extra);
        let output = self.berth(&args);
        assert!(output.status.success(), "ps failed: {}", stderr(&output));
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn berth_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_berth"));
    cmd.env_remove("BERTH_CONFIG");
    cmd.env_remove("BERTH_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn cli_version_exits_zero() {
    let output = berth_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "berth --version must exit 0");
    assert!(stdout(&output).contains("berth"));
}

#[test]
fn cli_help_lists_commands() {
    let output = berth_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = stdout(&output);
    for command in [
        "run", "stop", "pause", "delete", "remove", "ps", "expire", "report", "doctor",
    ] {
        assert!(help.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_run_project_marks_record_pending() {
    let ws = Workspace::new();
    let output = ws.berth(&["run", "project", "orders"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("accepted"));

    let records = ws.ps_json(&[]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "orders");
    assert_eq!(records[0]["environment"], "dev");
    assert_eq!(records[0]["type"], "project");
    assert_eq!(records[0]["transit"]["phase"], "pending");
    assert_eq!(records[0]["transit"]["action"], "run");
}

#[test]
fn cli_run_json_reports_outcome() {
    let ws = Workspace::new();
    let output = ws.berth(&["run", "devservice", "pg", "--env", "qa", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["outcome"], "accepted");
    assert_eq!(payload["environment"], "qa");
    assert_eq!(payload["type"], "devservice");
}

#[test]
fn cli_unknown_verb_is_unchanged() {
    let ws = Workspace::new();
    let output = ws.berth(&["dispatch", "project", "orders", "frobnicate"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("unchanged"));
    assert!(ws.ps_json(&[]).is_empty());
}

#[test]
fn cli_backend_failure_exits_one() {
    let ws = Workspace::new();
    // Each invocation gets a fresh mock engine, so the container is unknown.
    let output = ws.berth(&["stop", "project", "orders"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("runtime error"));

    let records = ws.ps_json(&[]);
    assert_eq!(records[0]["transit"]["action"], "stop");
}

#[test]
fn cli_remove_is_accepted() {
    let ws = Workspace::new();
    let output = ws.berth(&["remove", "project", "orders"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("accepted"));
}

#[test]
fn cli_report_settles_record() {
    let ws = Workspace::new();
    assert!(ws.berth(&["run", "project", "orders"]).status.success());

    let output = ws.berth(&["report", "orders", "running", "--container-id", "abc123"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("orders@dev is running"));

    let records = ws.ps_json(&[]);
    assert_eq!(records[0]["state"], "running");
    assert_eq!(records[0]["containerId"], "abc123");
    assert_eq!(records[0]["transit"]["phase"], "settled");
}

#[test]
fn cli_expire_settles_pending_records() {
    let ws = Workspace::new();
    assert!(ws.berth(&["run", "project", "orders"]).status.success());

    let output = ws.berth(&["expire", "--max-age", "0"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("expired orders@dev"));

    let records = ws.ps_json(&[]);
    assert_eq!(records[0]["state"], "unknown");
    assert_eq!(records[0]["transit"]["phase"], "settled");
}

#[test]
fn cli_ps_filters_by_environment_and_project() {
    let ws = Workspace::new();
    for args in [
        ["run", "project", "orders", "--env", "dev"],
        ["run", "project", "billing", "--env", "dev"],
        ["run", "project", "orders", "--env", "prod"],
        ["run", "devservice", "pg", "--env", "dev"],
    ] {
        assert!(ws.berth(&args).status.success());
    }

    let all = ws.ps_json(&[]);
    assert_eq!(all.len(), 4);
    let projects: Vec<&str> = all.iter().map(|r| r["projectId"].as_str().unwrap()).collect();
    let mut sorted = projects.clone();
    sorted.sort_unstable();
    assert_eq!(projects, sorted, "ps lists by project id");

    assert_eq!(ws.ps_json(&["--env", "prod"]).len(), 1);

    let orders = ws.ps_json(&["--project", "orders"]);
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["environment"], "dev");

    assert!(ws.ps_json(&["--project", "pg"]).is_empty());
}

#[test]
fn cli_doctor_is_healthy_with_mock_engine() {
    let ws = Workspace::new();
    let output = ws.berth(&["doctor", "--json"]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["healthy"], true);
}

#[test]
fn cli_invalid_config_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("berth.toml");
    std::fs::write(&config, "mode = \"sideways\"\n").unwrap();

    let output = berth_bin()
        .arg("--config")
        .arg(&config)
        .arg("ps")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("configuration error"));
}

#[test]
fn cli_unusable_store_exits_three() {
    let ws = Workspace::new();
    let blocker = ws.dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    let output = ws.berth(&["--store", &blocker.to_string_lossy(), "ps"]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
}

#[test]
fn cli_rejects_unknown_container_type() {
    let ws = Workspace::new();
    let output = ws.berth(&["run", "sidecar", "orders"]);
    assert!(!output.status.success());
}
