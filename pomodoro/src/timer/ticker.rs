// Once-per-second countdown driver
// Runs for the life of the daemon; paused and untimed phases make ticks no-ops

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::timer::engine::Engine;
use crate::timer::task::BackgroundTask;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Start ticking `engine`; stop the returned task to end the loop
pub fn spawn_ticker(engine: Engine) -> BackgroundTask {
    BackgroundTask::spawn(move |cancel| async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => engine.tick().await,
            }
        }
        tracing::debug!("ticker stopped");
    })
}
