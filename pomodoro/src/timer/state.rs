//! Timer state machine.
//!
//! [`TimerState`] is the single source of truth for the cycle. Every
//! transition is a plain method that mutates the state and appends the
//! [`Effect`]s it implies to an outbox; the caller decides how to deliver
//! them. Nothing here blocks, spawns, or touches the outside world.

use crate::timer::protocol::{Phase, RunStatus, StatusLine};
use crate::timer::settings::Durations;

/// Which sound to play for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    WorkStart,
    BreakStart,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Desktop notification with the given body
    Notify(String),
    /// Best-effort sound playback
    PlaySound(Sound),
    /// Waiting for the user began; start watching for input
    StartActivityMonitor,
    /// A timed phase began or the timer was reset; stop watching for input
    StopActivityMonitor,
}

/// Result of a TOGGLE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Paused,
    Resumed,
}

impl ToggleOutcome {
    /// Word sent back to the client after `OK`
    pub fn reply(self) -> &'static str {
        match self {
            ToggleOutcome::Started => "started",
            ToggleOutcome::Paused => "paused",
            ToggleOutcome::Resumed => "running",
        }
    }
}

/// SKIP issued with nothing to skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No active timer")]
pub struct NoActiveTimer;

/// In-memory timer state; one per daemon process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    phase: Phase,
    seconds_remaining: u32,
    paused: bool,
    completed_sessions: u32,
    total_sessions: u32,
    waiting_for_activity: bool,
}

impl TimerState {
    /// Fresh IDLE state; `total_sessions` is clamped to at least 1
    pub fn new(total_sessions: u32) -> Self {
        Self {
            phase: Phase::Idle,
            seconds_remaining: 0,
            paused: false,
            completed_sessions: 0,
            total_sessions: total_sessions.max(1),
            waiting_for_activity: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn completed_sessions(&self) -> u32 {
        self.completed_sessions
    }

    pub fn total_sessions(&self) -> u32 {
        self.total_sessions
    }

    pub fn is_waiting_for_activity(&self) -> bool {
        self.waiting_for_activity
    }

    pub fn run_status(&self) -> RunStatus {
        RunStatus::derive(self.phase, self.paused, self.waiting_for_activity)
    }

    /// Read-only snapshot for STATUS
    pub fn status_line(&self) -> StatusLine {
        StatusLine {
            phase: self.phase,
            seconds_remaining: self.seconds_remaining,
            completed_sessions: self.completed_sessions,
            total_sessions: self.total_sessions,
            status: self.run_status(),
        }
    }

    /// Start from IDLE, start work from WAITING_WORK, or flip the pause flag
    pub fn toggle(&mut self, durations: &Durations, out: &mut Vec<Effect>) -> ToggleOutcome {
        match self.phase {
            Phase::Idle | Phase::WaitingWork => {
                self.start_work(durations, out);
                ToggleOutcome::Started
            }
            Phase::Work | Phase::ShortBreak | Phase::LongBreak => {
                if self.paused {
                    self.paused = false;
                    out.push(Effect::Notify("Timer Resumed".to_string()));
                    ToggleOutcome::Resumed
                } else {
                    self.paused = true;
                    out.push(Effect::Notify("Timer Paused".to_string()));
                    ToggleOutcome::Paused
                }
            }
        }
    }

    /// Advance to the next phase without waiting for the countdown.
    ///
    /// Counter updates match natural completion; the completion
    /// notification and sound are left to the countdown path.
    pub fn skip(&mut self, durations: &Durations, out: &mut Vec<Effect>) -> Result<Phase, NoActiveTimer> {
        match self.phase {
            Phase::Idle => return Err(NoActiveTimer),
            Phase::Work => self.finish_work(durations, out),
            Phase::ShortBreak => self.enter_waiting(out),
            Phase::LongBreak => {
                self.completed_sessions = 0;
                self.enter_waiting(out);
            }
            Phase::WaitingWork => self.start_work(durations, out),
        }
        Ok(self.phase)
    }

    /// Unconditional return to IDLE
    pub fn reset(&mut self, out: &mut Vec<Effect>) {
        self.phase = Phase::Idle;
        self.seconds_remaining = 0;
        self.paused = false;
        self.completed_sessions = 0;
        self.waiting_for_activity = false;
        out.push(Effect::StopActivityMonitor);
    }

    /// One ticker second. Returns true when the tick completed a phase.
    pub fn tick(&mut self, durations: &Durations, out: &mut Vec<Effect>) -> bool {
        if self.paused || !self.phase.is_timed() {
            return false;
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return false;
        }

        self.complete_phase(durations, out);
        true
    }

    /// Input seen while waiting. Returns false if no longer waiting.
    pub fn activity_detected(&mut self, durations: &Durations, out: &mut Vec<Effect>) -> bool {
        if !self.waiting_for_activity {
            return false;
        }
        self.start_work(durations, out);
        true
    }

    /// Countdown reached zero: notify, play the matching sound, move on
    fn complete_phase(&mut self, durations: &Durations, out: &mut Vec<Effect>) {
        match self.phase {
            Phase::Work => {
                self.finish_work(durations, out);
                let message = if self.phase == Phase::LongBreak {
                    "Work Complete! Time for a long break."
                } else {
                    "Work Complete! Time for a short break."
                };
                out.push(Effect::Notify(message.to_string()));
                out.push(Effect::PlaySound(Sound::BreakStart));
            }
            Phase::ShortBreak => {
                out.push(Effect::Notify(format!(
                    "Break Over! Ready for work session {}/{}?",
                    self.completed_sessions + 1,
                    self.total_sessions
                )));
                out.push(Effect::PlaySound(Sound::WorkStart));
                self.enter_waiting(out);
            }
            Phase::LongBreak => {
                self.completed_sessions = 0;
                out.push(Effect::Notify(
                    "Long Break Over! Starting new cycle.".to_string(),
                ));
                out.push(Effect::PlaySound(Sound::WorkStart));
                self.enter_waiting(out);
            }
            Phase::Idle | Phase::WaitingWork => {}
        }
    }

    fn finish_work(&mut self, durations: &Durations, out: &mut Vec<Effect>) {
        self.completed_sessions = (self.completed_sessions + 1).min(self.total_sessions);
        if self.completed_sessions >= self.total_sessions {
            self.start_timed(Phase::LongBreak, durations.long_break_secs, out);
        } else {
            self.start_timed(Phase::ShortBreak, durations.short_break_secs, out);
        }
    }

    fn start_work(&mut self, durations: &Durations, out: &mut Vec<Effect>) {
        self.start_timed(Phase::Work, durations.work_secs, out);
    }

    fn start_timed(&mut self, phase: Phase, seconds: u32, out: &mut Vec<Effect>) {
        self.phase = phase;
        self.seconds_remaining = seconds;
        self.paused = false;
        self.waiting_for_activity = false;
        out.push(Effect::StopActivityMonitor);
    }

    fn enter_waiting(&mut self, out: &mut Vec<Effect>) {
        self.phase = Phase::WaitingWork;
        self.seconds_remaining = 0;
        self.paused = false;
        self.waiting_for_activity = true;
        out.push(Effect::Notify(
            "Move your mouse to start next work session".to_string(),
        ));
        out.push(Effect::StartActivityMonitor);
    }
}
