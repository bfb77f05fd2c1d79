// Shared timer engine: one lock around the state machine and its monitor slot
// Commands, ticks and activity detections all serialize through here

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::timer::activity::{run_activity_monitor, IdleProbe, ProbeError};
use crate::timer::notify::{Notice, NoticeSender};
use crate::timer::protocol::{Command, Response, StatusLine};
use crate::timer::settings::Durations;
use crate::timer::state::{Effect, TimerState};
use crate::timer::task::{BackgroundTask, MonitorSlot};

/// Delay between answering STOP and beginning shutdown, so the reply is flushed
pub const STOP_GRACE: Duration = Duration::from_millis(100);

struct Inner {
    state: TimerState,
    monitor: MonitorSlot,
}

struct Shared {
    durations: Durations,
    notices: NoticeSender,
    probe: Arc<dyn IdleProbe>,
    detection_disabled: AtomicBool,
    shutdown: CancellationToken,
}

/// Cloneable handle to the daemon's single timer
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Mutex<Inner>>,
    shared: Arc<Shared>,
}

impl Engine {
    pub fn new(
        durations: Durations,
        total_sessions: u32,
        notices: NoticeSender,
        probe: Arc<dyn IdleProbe>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: TimerState::new(total_sessions),
                monitor: MonitorSlot::default(),
            })),
            shared: Arc::new(Shared {
                durations,
                notices,
                probe,
                detection_disabled: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Execute one client command and build its reply
    pub async fn dispatch(&self, command: Command) -> Response {
        tracing::debug!(%command, "dispatching command");

        let mut inner = self.inner.lock().await;
        let mut out = Vec::new();
        let durations = &self.shared.durations;

        let response = match command {
            Command::Status => return Response::Status(inner.state.status_line()),
            Command::Stop => {
                self.request_shutdown();
                return Response::Ok(None);
            }
            Command::Toggle => {
                let outcome = inner.state.toggle(durations, &mut out);
                Response::ok(outcome.reply())
            }
            Command::Skip => match inner.state.skip(durations, &mut out) {
                Ok(phase) => Response::ok(phase.as_str()),
                Err(e) => Response::err(e.to_string()),
            },
            Command::Reset => {
                inner.state.reset(&mut out);
                Response::ok("idle")
            }
        };

        self.apply(&mut inner, out);
        tracing::info!(%command, state = %Response::Status(inner.state.status_line()), "command applied");
        response
    }

    /// One second of countdown
    pub async fn tick(&self) {
        let mut inner = self.inner.lock().await;
        let mut out = Vec::new();
        if inner.state.tick(&self.shared.durations, &mut out) {
            tracing::info!(phase = %inner.state.phase(), "phase completed");
        }
        self.apply(&mut inner, out);
    }

    pub async fn snapshot(&self) -> StatusLine {
        self.inner.lock().await.state.status_line()
    }

    pub async fn is_waiting(&self) -> bool {
        self.inner.lock().await.state.is_waiting_for_activity()
    }

    pub async fn monitor_running(&self) -> bool {
        self.inner.lock().await.monitor.is_running()
    }

    /// Input reported by the monitor owning `cancel`. Ignored once that
    /// monitor has been stopped, so a stale detection cannot start work.
    pub async fn activity_detected(&self, cancel: &CancellationToken) {
        let mut inner = self.inner.lock().await;
        if cancel.is_cancelled() {
            tracing::debug!("ignoring activity from a stopped monitor");
            return;
        }

        let mut out = Vec::new();
        if inner.state.activity_detected(&self.shared.durations, &mut out) {
            tracing::info!("work session started by activity");
        }
        self.apply(&mut inner, out);
    }

    /// Turn detection off for the rest of the process; TOGGLE still works
    pub fn disable_activity_detection(&self, reason: &ProbeError) {
        if !self.shared.detection_disabled.swap(true, Ordering::SeqCst) {
            tracing::warn!(error = %reason, "activity detection disabled, use toggle to start work");
        }
    }

    pub fn activity_detection_enabled(&self) -> bool {
        !self.shared.detection_disabled.load(Ordering::SeqCst)
    }

    /// Stop the monitor if one is running
    pub async fn stop_activity_monitor(&self) {
        self.inner.lock().await.monitor.stop();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    /// Begin shutdown after [`STOP_GRACE`]
    pub fn request_shutdown(&self) {
        let token = self.shared.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STOP_GRACE).await;
            tracing::info!("shutdown requested");
            token.cancel();
        });
    }

    fn apply(&self, inner: &mut Inner, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(message) => self.shared.notices.send(Notice::Message(message)),
                Effect::PlaySound(sound) => self.shared.notices.send(Notice::Sound(sound)),
                Effect::StartActivityMonitor => self.start_monitor(inner),
                Effect::StopActivityMonitor => {
                    if inner.monitor.stop() {
                        tracing::debug!("activity monitor stopped");
                    }
                }
            }
        }
    }

    fn start_monitor(&self, inner: &mut Inner) {
        inner.monitor.stop();
        if !self.activity_detection_enabled() {
            tracing::debug!("activity detection disabled, waiting for toggle");
            return;
        }

        let engine = self.clone();
        let probe = Arc::clone(&self.shared.probe);
        inner.monitor = MonitorSlot::Running(BackgroundTask::spawn(move |cancel| {
            run_activity_monitor(engine, probe, cancel)
        }));
    }
}
