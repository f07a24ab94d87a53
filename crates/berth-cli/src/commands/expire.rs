use super::{json_pretty, EXIT_SUCCESS};
use berth_core::ControlPlane;
use std::time::Duration;

pub fn run(plane: &ControlPlane, max_age: Option<u64>, json: bool) -> Result<u8, String> {
    let max_age = max_age.map_or(plane.context().pending_timeout, Duration::from_secs);
    let expired = plane
        .engine()
        .expire_pending(max_age)
        .map_err(|e| e.to_string())?;

    if json {
        let keys: Vec<String> = expired.iter().map(ToString::to_string).collect();
        let payload = serde_json::json!({
            "max_age_secs": max_age.as_secs(),
            "expired": keys,
        });
        println!("{}", json_pretty(&payload)?);
    } else if expired.is_empty() {
        println!("no records pending longer than {}s", max_age.as_secs());
    } else {
        for key in &expired {
            println!("expired {key}");
        }
    }
    Ok(EXIT_SUCCESS)
}
