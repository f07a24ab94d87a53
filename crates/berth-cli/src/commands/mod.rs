pub mod doctor;
pub mod expire;
pub mod lifecycle;
pub mod ps;
pub mod report;

use berth_core::ControlPlane;
use berth_schema::{BerthConfig, DeploymentMode};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn open_plane(config: &BerthConfig) -> Result<ControlPlane, String> {
    ControlPlane::from_config(config).map_err(|e| e.to_string())
}

/// CLI binary the driver for `mode` shells out to.
pub fn driver_binary(config: &BerthConfig, mode: DeploymentMode) -> &str {
    match mode {
        DeploymentMode::Local => &config.engine.binary,
        DeploymentMode::Cluster => &config.cluster.kubectl,
    }
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().green().bold().apply_to(state).to_string(),
        "created" | "restarting" => Style::new().cyan().apply_to(state).to_string(),
        "paused" => Style::new().yellow().apply_to(state).to_string(),
        "exited" | "removing" => Style::new().dim().apply_to(state).to_string(),
        "dead" => Style::new().red().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}
