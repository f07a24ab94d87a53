use crate::engine::StatusEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Periodically settle records whose backend report never arrived.
///
/// Must be called from within a tokio runtime. Abort the handle to stop.
pub fn spawn_watchdog(
    engine: Arc<StatusEngine>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let engine = Arc::clone(&engine);
            match tokio::task::spawn_blocking(move || engine.expire_pending(max_age)).await {
                Ok(Ok(expired)) if !expired.is_empty() => {
                    info!("watchdog expired {} pending record(s)", expired.len());
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("watchdog sweep failed: {e}"),
                Err(e) => {
                    error!("watchdog sweep panicked: {e}");
                    break;
                }
            }
        }
    })
}
