// Environment configuration helpers for the daemon
// Resolves the per-user runtime directory and the control socket inside it

use std::path::{Path, PathBuf};

const SOCKET_FILE_NAME: &str = "pomodoro.sock";

/// Configuration for daemon paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the control socket
    pub runtime_dir: PathBuf,
    /// Path to the Unix socket; its presence doubles as the liveness marker
    pub socket_path: PathBuf,
}

impl Config {
    /// Build a configuration rooted at `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let runtime_dir = dir.into();
        Self {
            socket_path: runtime_dir.join(SOCKET_FILE_NAME),
            runtime_dir,
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        // POMODORO_RUNTIME_DIR isolates an instance (tests, side-by-side daemons)
        if let Ok(override_dir) = std::env::var("POMODORO_RUNTIME_DIR") {
            return Self::in_dir(override_dir);
        }

        Self::default_paths()
    }

    /// `$XDG_RUNTIME_DIR/pomodoro.sock`, else `/tmp/pomodoro-<uid>.sock`
    pub fn default_paths() -> Self {
        match std::env::var("XDG_RUNTIME_DIR") {
            Ok(runtime_dir) if !runtime_dir.is_empty() => Self::in_dir(runtime_dir),
            _ => {
                let tmp = std::env::temp_dir();
                Self {
                    socket_path: tmp.join(format!("pomodoro-{}.sock", current_uid())),
                    runtime_dir: tmp,
                }
            }
        }
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    /// Ensure the runtime directory exists
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.runtime_dir)
    }

    /// Check if the daemon socket exists (indicating a daemon may be running)
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Remove the socket file
    pub fn remove_socket(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.socket_path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(unix)]
fn current_uid() -> u32 {
    // SAFETY: getuid has no preconditions and cannot fail
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    0
}
