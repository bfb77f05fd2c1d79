// Timer protocol - shared types for daemon <-> CLI communication
// One newline-terminated text line per request and per response over a Unix socket

use std::fmt;
use std::str::FromStr;

/// Maximum accepted request line, in bytes (including the newline)
pub const MAX_REQUEST_LINE_SIZE: usize = 1024;

/// Timer phase reflecting the current mode of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No timer running; initial state and the target of RESET
    Idle,
    /// Counting down a work session
    Work,
    /// Counting down a short break
    ShortBreak,
    /// Counting down the long break that ends a cycle
    LongBreak,
    /// Break finished; waiting for user activity or a manual command
    WaitingWork,
}

impl Phase {
    /// Whether the phase has a countdown the ticker advances
    pub fn is_timed(self) -> bool {
        matches!(self, Phase::Work | Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Work => "WORK",
            Phase::ShortBreak => "SHORT_BREAK",
            Phase::LongBreak => "LONG_BREAK",
            Phase::WaitingWork => "WAITING_WORK",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(Phase::Idle),
            "WORK" => Ok(Phase::Work),
            "SHORT_BREAK" => Ok(Phase::ShortBreak),
            "LONG_BREAK" => Ok(Phase::LongBreak),
            "WAITING_WORK" => Ok(Phase::WaitingWork),
            _ => Err(format!("Unknown phase: {}", s)),
        }
    }
}

/// Human-facing run status reported in STATUS responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Paused,
    Waiting,
    Stopped,
}

impl RunStatus {
    /// Derive the status word: paused wins, then waiting, then idle
    pub fn derive(phase: Phase, paused: bool, waiting_for_activity: bool) -> Self {
        if paused {
            RunStatus::Paused
        } else if waiting_for_activity {
            RunStatus::Waiting
        } else if phase == Phase::Idle {
            RunStatus::Stopped
        } else {
            RunStatus::Running
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Waiting => "waiting",
            RunStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "paused" => Ok(RunStatus::Paused),
            "waiting" => Ok(RunStatus::Waiting),
            "stopped" => Ok(RunStatus::Stopped),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

// ============================================================================
// Client -> Daemon requests
// ============================================================================

/// Command sent by the CLI or tray to the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start, pause, resume, or start the next work session
    Toggle,
    /// Read-only report of the timer
    Status,
    /// Jump to the next phase
    Skip,
    /// Return to IDLE and clear counters
    Reset,
    /// Shut the daemon down
    Stop,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Toggle => "TOGGLE",
            Command::Status => "STATUS",
            Command::Skip => "SKIP",
            Command::Reset => "RESET",
            Command::Stop => "STOP",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request line did not name a known command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {token:?}")]
pub struct ParseCommandError {
    pub token: String,
}

impl FromStr for Command {
    type Err = ParseCommandError;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase();
        match token.as_str() {
            "TOGGLE" => Ok(Command::Toggle),
            "STATUS" => Ok(Command::Status),
            "SKIP" => Ok(Command::Skip),
            "RESET" => Ok(Command::Reset),
            "STOP" => Ok(Command::Stop),
            _ => Err(ParseCommandError { token }),
        }
    }
}

// ============================================================================
// Daemon -> Client responses
// ============================================================================

/// Snapshot carried by a STATUS response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub phase: Phase,
    pub seconds_remaining: u32,
    pub completed_sessions: u32,
    pub total_sessions: u32,
    pub status: RunStatus,
}

/// Response line from daemon to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK` or `OK <message>`
    Ok(Option<String>),
    /// `ERR <message>`
    Err(String),
    /// `<PHASE> <seconds> <completed>/<total> <status>`
    Status(StatusLine),
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Response::Ok(Some(message.into()))
    }

    pub fn err(message: impl Into<String>) -> Self {
        Response::Err(message.into())
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Response::Err(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(None) => write!(f, "OK"),
            Response::Ok(Some(message)) => write!(f, "OK {}", message),
            Response::Err(message) => write!(f, "ERR {}", message),
            Response::Status(line) => write!(
                f,
                "{} {} {}/{} {}",
                line.phase,
                line.seconds_remaining,
                line.completed_sessions,
                line.total_sessions,
                line.status
            ),
        }
    }
}

impl FromStr for Response {
    type Err = String;

    // `Self::Err` would be ambiguous with the `Err` variant
    fn from_str(s: &str) -> Result<Self, String> {
        let line = s.trim();
        if line == "OK" {
            return Ok(Response::Ok(None));
        }
        if let Some(message) = line.strip_prefix("OK ") {
            return Ok(Response::ok(message));
        }
        if let Some(message) = line.strip_prefix("ERR ") {
            return Ok(Response::err(message));
        }
        if line == "ERR" {
            return Ok(Response::err(""));
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let &[phase, seconds, sessions, status] = parts.as_slice() else {
            return Err(format!("Malformed response: {}", line));
        };
        let (completed, total) = sessions
            .split_once('/')
            .ok_or_else(|| format!("Malformed session counter: {}", sessions))?;
        let parse_num = |v: &str| {
            v.parse::<u32>()
                .map_err(|e| format!("Malformed number {:?}: {}", v, e))
        };

        Ok(Response::Status(StatusLine {
            phase: phase.parse()?,
            seconds_remaining: parse_num(seconds)?,
            completed_sessions: parse_num(completed)?,
            total_sessions: parse_num(total)?,
            status: status.parse()?,
        }))
    }
}

// ============================================================================
// Helpers for line framing
// ============================================================================

/// Encode a response as one newline-terminated line
pub fn encode_response(response: &Response) -> String {
    format!("{}\n", response)
}

/// Encode a command as one newline-terminated line
pub fn encode_command(command: Command) -> String {
    format!("{}\n", command)
}
