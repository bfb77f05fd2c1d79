use super::polling::{wait_for_path, WaitError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const READY_TIMEOUT: Duration = Duration::from_secs(5);

pub const SOCKET_FILE_NAME: &str = "pomodoro.sock";

pub fn daemon_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pomodoro-daemon"))
}

pub fn client_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pomodoro"))
}

/// Environment isolating a daemon in `runtime_dir`, with no user config file
pub fn isolated_env(runtime_dir: &Path) -> [(&'static str, PathBuf); 2] {
    [
        ("POMODORO_RUNTIME_DIR", runtime_dir.to_path_buf()),
        ("POMODORO_CONFIG", runtime_dir.join("missing-config.toml")),
    ]
}

/// RAII wrapper that ensures the daemon process is cleaned up.
pub struct DaemonGuard {
    child: Child,
    socket_path: PathBuf,
}

impl DaemonGuard {
    /// Start the compiled daemon and wait for its socket.
    pub fn start(runtime_dir: &Path) -> Result<Self, DaemonError> {
        let child = Command::new(daemon_binary())
            .envs(isolated_env(runtime_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(DaemonError::SpawnFailed)?;

        let guard = Self {
            child,
            socket_path: runtime_dir.join(SOCKET_FILE_NAME),
        };
        wait_for_path(&guard.socket_path, true, READY_TIMEOUT).map_err(DaemonError::ReadyTimeout)?;
        Ok(guard)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send SIGTERM, the daemon's graceful shutdown path
    pub fn terminate(&self) {
        #[cfg(unix)]
        unsafe {
            libc::kill(self.pid() as i32, libc::SIGTERM);
        }
    }

    /// Wait for the process to exit on its own
    pub fn wait_for_exit(&mut self, timeout: Duration) -> Option<ExitStatus> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Some(status);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        None
    }
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }

        if let Err(err) = self.child.kill() {
            eprintln!(
                "Failed to terminate pomodoro-daemon pid {}: {}",
                self.child.id(),
                err
            );
            return;
        }

        let _ = self.child.wait();
    }
}

/// Errors that can occur when starting the daemon for tests.
#[derive(Debug)]
pub enum DaemonError {
    SpawnFailed(std::io::Error),
    ReadyTimeout(WaitError),
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed(err) => write!(f, "failed to spawn daemon: {}", err),
            Self::ReadyTimeout(err) => write!(f, "daemon never became ready: {}", err),
        }
    }
}

impl std::error::Error for DaemonError {}
