use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const INITIAL_DELAY_MS: u64 = 20;
const MAX_DELAY_MS: u64 = 500;

/// Error returned when a path never reached the expected state.
#[derive(Debug)]
pub struct WaitError {
    path: PathBuf,
    want_present: bool,
    attempts: u32,
    waited: Duration,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timed out after {} attempts over {:?} waiting for {} to be {}",
            self.attempts,
            self.waited,
            self.path.display(),
            if self.want_present { "created" } else { "removed" }
        )
    }
}

impl std::error::Error for WaitError {}

/// Poll until `path` exists (`present = true`) or is gone (`present = false`).
///
/// Backs off exponentially from 20ms up to 500ms between checks.
pub fn wait_for_path(path: &Path, present: bool, timeout: Duration) -> Result<(), WaitError> {
    let start = Instant::now();
    let mut delay = Duration::from_millis(INITIAL_DELAY_MS);
    let mut attempts = 0;

    loop {
        attempts += 1;
        if path.exists() == present {
            return Ok(());
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return Err(WaitError {
                path: path.to_path_buf(),
                want_present: present,
                attempts,
                waited: start.elapsed(),
            });
        }

        thread::sleep(delay.min(remaining));
        delay = (delay * 2).min(Duration::from_millis(MAX_DELAY_MS));
    }
}
