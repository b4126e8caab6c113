use crate::engine::PollEngine;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

/// Periodically finalizes polls that are past their end time.
///
/// Per-poll timers normally end polls on time; this catches anything they
/// missed, such as timers lost to a panic or a clock jump.
pub async fn check_expired_polls_task(engine: Arc<PollEngine>, period: Duration) {
    info!("Starting background task to check for expired polls every {:?}", period);
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await; // Wait for the next interval tick

        match engine.sweep().await {
            Ok(0) => {}
            Ok(count) => info!("Sweep finalized {} expired poll(s)", count),
            Err(e) => error!("Failed to sweep expired polls: {}", e),
        }
    }
}
