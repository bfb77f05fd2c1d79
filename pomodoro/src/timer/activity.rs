//! Idle-time based activity detection.
//!
//! While the timer waits for the user, a monitor task polls the host idle
//! counter every [`POLL_INTERVAL`]. A reading below [`IDLE_THRESHOLD_MS`], or
//! one lower than the previous reading, counts as fresh input and starts the
//! next work session. The probe sits behind [`IdleProbe`] so another source
//! (an input event subscription, a different tool) can be swapped in.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::timer::engine::Engine;

/// Poll cadence of the monitor loop
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Idle readings below this are treated as ongoing input
pub const IDLE_THRESHOLD_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The probe cannot run on this host at all
    #[error("idle probe unavailable: {0}")]
    Unavailable(String),
    /// The probe ran but reported failure
    #[error("idle probe failed: {0}")]
    Failed(String),
    /// The probe ran but its output was not a number
    #[error("idle probe returned malformed output: {0:?}")]
    Malformed(String),
}

impl ProbeError {
    /// Transient errors are retried on the next poll
    pub fn is_permanent(&self) -> bool {
        matches!(self, ProbeError::Unavailable(_))
    }
}

/// Source of "milliseconds since last input". May block.
pub trait IdleProbe: Send + Sync + 'static {
    fn idle_millis(&self) -> Result<u64, ProbeError>;
}

/// X11 idle time via the `xprintidle` tool
#[derive(Debug, Clone)]
pub struct XprintidleProbe {
    program: String,
}

impl Default for XprintidleProbe {
    fn default() -> Self {
        Self {
            program: "xprintidle".to_string(),
        }
    }
}

impl XprintidleProbe {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl IdleProbe for XprintidleProbe {
    fn idle_millis(&self) -> Result<u64, ProbeError> {
        let output = Command::new(&self.program)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ProbeError::Unavailable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(ProbeError::Failed(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        parse_idle_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_idle_output(text: &str) -> Result<u64, ProbeError> {
    let trimmed = text.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| ProbeError::Malformed(trimmed.to_string()))
}

/// Decides whether a sequence of idle readings shows user input
#[derive(Debug, Default)]
pub struct ActivityDetector {
    previous: Option<u64>,
}

impl ActivityDetector {
    /// Feed one reading; true means activity was seen
    pub fn observe(&mut self, idle_ms: u64) -> bool {
        let decreased = self.previous.is_some_and(|prev| idle_ms < prev);
        self.previous = Some(idle_ms);
        decreased || idle_ms < IDLE_THRESHOLD_MS
    }
}

/// Monitor loop; exits on cancel, on phase change, or after one detection
pub async fn run_activity_monitor(
    engine: Engine,
    probe: Arc<dyn IdleProbe>,
    cancel: CancellationToken,
) {
    let mut detector = ActivityDetector::default();
    tracing::debug!("activity monitor started");

    loop {
        if cancel.is_cancelled() || !engine.is_waiting().await {
            tracing::debug!("activity monitor superseded");
            return;
        }

        let query = Arc::clone(&probe);
        match tokio::task::spawn_blocking(move || query.idle_millis()).await {
            Ok(Ok(idle_ms)) => {
                if detector.observe(idle_ms) {
                    tracing::info!(idle_ms, "activity detected");
                    engine.activity_detected(&cancel).await;
                    return;
                }
            }
            Ok(Err(e)) if e.is_permanent() => {
                engine.disable_activity_detection(&e);
                return;
            }
            Ok(Err(e)) => tracing::debug!(error = %e, "idle query failed, retrying"),
            Err(e) => tracing::warn!(error = %e, "idle query task failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("activity monitor cancelled");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}
