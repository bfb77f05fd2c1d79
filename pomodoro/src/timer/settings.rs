// User settings for the timer, read once at daemon startup
// Loaded from ~/.config/pomodoro/config.toml; every problem falls back to defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORK_MINUTES: i64 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: i64 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: i64 = 20;
pub const DEFAULT_WORK_SESSIONS_PER_CYCLE: i64 = 3;

/// Phase lengths in seconds, derived from validated settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub work_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,
}

impl Durations {
    pub fn from_minutes(work: u32, short_break: u32, long_break: u32) -> Self {
        Self {
            work_secs: work.saturating_mul(60),
            short_break_secs: short_break.saturating_mul(60),
            long_break_secs: long_break.saturating_mul(60),
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Settings::default().durations()
    }
}

/// Contents of config.toml
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub work_minutes: i64,
    pub short_break_minutes: i64,
    pub long_break_minutes: i64,
    pub work_sessions_per_cycle: i64,
    /// Sound file played when a work session is about to start
    pub sound_work_start: Option<PathBuf>,
    /// Sound file played when a break starts
    pub sound_break_start: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            work_sessions_per_cycle: DEFAULT_WORK_SESSIONS_PER_CYCLE,
            sound_work_start: None,
            sound_break_start: None,
        }
    }
}

impl Settings {
    /// Location of the settings file; `POMODORO_CONFIG` overrides it
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("POMODORO_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("pomodoro").join("config.toml"))
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::info!("no config directory available, using default settings");
                Self::default()
            }
        }
    }

    /// Load settings from `path`, never failing
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config file, using defaults");
                return Self::default();
            }
        };

        match toml::from_str::<Settings>(&content) {
            Ok(settings) => settings.validated(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config file, using defaults");
                Self::default()
            }
        }
    }

    /// Replace each non-positive value with its default
    pub fn validated(mut self) -> Self {
        fn fix(key: &str, value: &mut i64, default: i64) {
            if *value <= 0 {
                tracing::warn!(key, value = *value, default, "invalid setting, using default");
                *value = default;
            }
        }

        fix("work_minutes", &mut self.work_minutes, DEFAULT_WORK_MINUTES);
        fix(
            "short_break_minutes",
            &mut self.short_break_minutes,
            DEFAULT_SHORT_BREAK_MINUTES,
        );
        fix(
            "long_break_minutes",
            &mut self.long_break_minutes,
            DEFAULT_LONG_BREAK_MINUTES,
        );
        fix(
            "work_sessions_per_cycle",
            &mut self.work_sessions_per_cycle,
            DEFAULT_WORK_SESSIONS_PER_CYCLE,
        );
        self
    }

    pub fn durations(&self) -> Durations {
        Durations::from_minutes(
            positive_u32(self.work_minutes, DEFAULT_WORK_MINUTES),
            positive_u32(self.short_break_minutes, DEFAULT_SHORT_BREAK_MINUTES),
            positive_u32(self.long_break_minutes, DEFAULT_LONG_BREAK_MINUTES),
        )
    }

    /// Work sessions per cycle, always at least 1
    pub fn total_sessions(&self) -> u32 {
        positive_u32(
            self.work_sessions_per_cycle,
            DEFAULT_WORK_SESSIONS_PER_CYCLE,
        )
    }
}

fn positive_u32(value: i64, default: i64) -> u32 {
    let value = if value > 0 { value } else { default };
    u32::try_from(value).unwrap_or(u32::MAX)
}
