// Daemon client used by the CLI
// Sends one command over the Unix socket, starting the daemon first if needed

use super::config::Config;
use super::protocol::{encode_command, Command};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};
use std::time::Duration;

pub const DAEMON_BINARY_NAME: &str = "pomodoro-daemon";

const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const STARTUP_POLL_ATTEMPTS: u32 = 20;
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Locate the daemon binary: next to the current executable, else rely on PATH
pub fn resolve_daemon_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(DAEMON_BINARY_NAME);
            if candidate.is_file() {
                return candidate;
            }
        }
    }
    PathBuf::from(DAEMON_BINARY_NAME)
}

/// Connect to the daemon, starting it if necessary
pub fn connect_or_start_daemon(config: &Config, daemon_path: &Path) -> Result<UnixStream> {
    // Try to connect first
    if let Ok(stream) = UnixStream::connect(&config.socket_path) {
        return Ok(stream);
    }

    tracing::debug!(daemon = %daemon_path.display(), "daemon not running, starting it");

    // Detached: the daemon outlives this process
    Process::new(daemon_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start daemon at {}", daemon_path.display()))?;

    for _ in 0..STARTUP_POLL_ATTEMPTS {
        std::thread::sleep(STARTUP_POLL_INTERVAL);
        if config.socket_exists() {
            if let Ok(stream) = UnixStream::connect(&config.socket_path) {
                return Ok(stream);
            }
        }
    }

    Err(anyhow::anyhow!(
        "daemon failed to create socket at {}",
        config.socket_path.display()
    ))
}

/// Send one command on an open connection and return the trimmed reply line
pub fn exchange(mut stream: UnixStream, command: Command) -> Result<String> {
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .context("Failed to set read timeout")?;
    stream
        .set_write_timeout(Some(WRITE_TIMEOUT))
        .context("Failed to set write timeout")?;

    stream
        .write_all(encode_command(command).as_bytes())
        .context("Failed to send command to daemon")?;
    stream.flush().context("Failed to flush command")?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .context("Failed to read response from daemon")?;
    if n == 0 {
        anyhow::bail!("daemon closed the connection without replying");
    }

    Ok(line.trim().to_string())
}

/// Send `command`, starting the daemon if none is listening
pub fn send_command(config: &Config, command: Command) -> Result<String> {
    let stream = connect_or_start_daemon(config, &resolve_daemon_path())?;
    exchange(stream, command)
}

/// Send `command` only if a daemon is already listening
pub fn send_to_running(config: &Config, command: Command) -> Result<String> {
    let stream = UnixStream::connect(&config.socket_path).with_context(|| {
        format!(
            "No daemon running (socket: {})",
            config.socket_path.display()
        )
    })?;
    exchange(stream, command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use tempfile::TempDir;

    /// Accept one connection, check the request line, answer with `reply`
    fn serve_once(listener: UnixListener, expect: &'static str, reply: &'static str) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, expect);
            (&stream).write_all(reply.as_bytes()).unwrap();
        })
    }

    #[test]
    fn test_send_to_running_exchanges_one_line() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::in_dir(temp_dir.path());
        let listener = UnixListener::bind(&config.socket_path).unwrap();
        let server = serve_once(listener, "STATUS\n", "IDLE 0 0/3 stopped\n");

        let reply = send_to_running(&config, Command::Status).unwrap();
        assert_eq!(reply, "IDLE 0 0/3 stopped");
        server.join().unwrap();
    }

    #[test]
    fn test_send_to_running_without_daemon_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::in_dir(temp_dir.path());

        let err = send_to_running(&config, Command::Stop).unwrap_err();
        assert!(err.to_string().contains("No daemon running"));
    }

    #[test]
    fn test_existing_daemon_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::in_dir(temp_dir.path());
        let listener = UnixListener::bind(&config.socket_path).unwrap();
        let server = serve_once(listener, "TOGGLE\n", "OK started\n");

        // A bogus daemon path proves nothing was spawned
        let stream = connect_or_start_daemon(&config, Path::new("/nonexistent/pomodoro-daemon")).unwrap();
        assert_eq!(exchange(stream, Command::Toggle).unwrap(), "OK started");
        server.join().unwrap();
    }

    #[test]
    fn test_missing_daemon_binary_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::in_dir(temp_dir.path());

        let err = connect_or_start_daemon(&config, Path::new("/nonexistent/pomodoro-daemon")).unwrap_err();
        assert!(err.to_string().contains("Failed to start daemon"));
    }

    #[test]
    fn test_daemon_that_never_binds_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::in_dir(temp_dir.path());

        // `true` starts and exits without creating the socket
        let err = connect_or_start_daemon(&config, Path::new("true")).unwrap_err();
        assert!(err.to_string().contains("daemon failed to create socket"));
    }
}
