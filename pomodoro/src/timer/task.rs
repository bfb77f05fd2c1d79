// Cancellable background tasks (ticker, activity monitor)
// Each task owns a CancellationToken; stopping consumes the handle so it happens once

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a spawned loop that exits when its token is cancelled
#[derive(Debug)]
pub struct BackgroundTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `make(token)` on the current runtime
    pub fn spawn<F, Fut>(make: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(make(cancel.clone()));
        Self { cancel, handle }
    }

    /// Signal the loop to exit at its next check point
    pub fn stop(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.handle
    }
}

/// Slot for the at-most-one activity monitor
#[derive(Debug, Default)]
pub enum MonitorSlot {
    #[default]
    Inactive,
    Running(BackgroundTask),
}

impl MonitorSlot {
    pub fn is_running(&self) -> bool {
        matches!(self, MonitorSlot::Running(_))
    }

    /// Cancel the current monitor, if any, and leave the slot empty.
    /// Returns true if a monitor was stopped.
    pub fn stop(&mut self) -> bool {
        match std::mem::take(self) {
            MonitorSlot::Running(task) => {
                drop(task.stop());
                true
            }
            MonitorSlot::Inactive => false,
        }
    }
}
