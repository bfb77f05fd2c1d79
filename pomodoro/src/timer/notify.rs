//! Desktop notifications and sound alerts for phase changes.
//!
//! Transitions only enqueue [`Notice`]s; a separate task drains the queue
//! and shells out to `notify-send` and `paplay`/`aplay`. A slow or missing
//! tool therefore never holds the timer lock. Every failure is logged and
//! dropped.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::timer::settings::Settings;
use crate::timer::state::Sound;

const APP_NAME: &str = "Pomodoro";
const NOTIFICATION_TITLE: &str = "Pomodoro Timer";
const NOTIFICATION_ICON: &str = "appointment-soon";

const WORK_START_SOUNDS: &[&str] = &[
    "/usr/share/sounds/freedesktop/stereo/bell.oga",
    "/usr/share/sounds/freedesktop/stereo/message-new-instant.oga",
];
const BREAK_START_SOUNDS: &[&str] = &[
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
    "/usr/share/sounds/gnome/default/alerts/glass.ogg",
];

/// Fire-and-forget request for the notifier task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Message(String),
    Sound(Sound),
}

/// Delivers notices to the desktop. Calls may block; they run on the
/// blocking pool.
pub trait Dispatcher: Send + Sync + 'static {
    fn notify(&self, message: &str);
    fn play_sound(&self, sound: Sound);
}

/// Producer half of the notice queue; sending never blocks
#[derive(Debug, Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<Notice>,
}

impl NoticeSender {
    pub fn send(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            tracing::debug!("notifier task gone, dropping notice");
        }
    }
}

pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NoticeSender { tx }, rx)
}

/// Drain the queue until every sender is dropped
pub async fn run_notifier(mut rx: NoticeReceiver, dispatcher: Arc<dyn Dispatcher>) {
    while let Some(notice) = rx.recv().await {
        let dispatcher = Arc::clone(&dispatcher);
        let result = tokio::task::spawn_blocking(move || match notice {
            Notice::Message(message) => dispatcher.notify(&message),
            Notice::Sound(sound) => dispatcher.play_sound(sound),
        })
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "notification dispatch panicked");
        }
    }
    tracing::debug!("notifier stopped");
}

/// Linux desktop delivery via notify-send and PulseAudio/ALSA players
#[derive(Debug, Clone, Default)]
pub struct DesktopDispatcher {
    work_sound: Option<PathBuf>,
    break_sound: Option<PathBuf>,
}

impl DesktopDispatcher {
    pub fn new(settings: &Settings) -> Self {
        Self {
            work_sound: settings.sound_work_start.clone(),
            break_sound: settings.sound_break_start.clone(),
        }
    }

    /// Configured file if it exists, else the first installed theme sound
    fn sound_file(&self, sound: Sound) -> Option<PathBuf> {
        let (configured, candidates) = match sound {
            Sound::WorkStart => (&self.work_sound, WORK_START_SOUNDS),
            Sound::BreakStart => (&self.break_sound, BREAK_START_SOUNDS),
        };

        if let Some(path) = configured {
            if path.exists() {
                return Some(path.clone());
            }
            tracing::warn!(path = %path.display(), "configured sound file missing, using theme sound");
        }

        candidates
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Dispatcher for DesktopDispatcher {
    fn notify(&self, message: &str) {
        let result = Command::new("notify-send")
            .args(["-a", APP_NAME, "-i", NOTIFICATION_ICON, NOTIFICATION_TITLE, message])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!(%status, "notification failed"),
            Err(e) => tracing::warn!(error = %e, "notification failed"),
        }
    }

    fn play_sound(&self, sound: Sound) {
        let Some(path) = self.sound_file(sound) else {
            tracing::debug!(?sound, "no sound file available");
            return;
        };

        // Try paplay (PulseAudio) first, then aplay (ALSA)
        if run_quietly("paplay", &[], &path) {
            return;
        }
        if !run_quietly("aplay", &["-q"], &path) {
            tracing::warn!(path = %path.display(), "sound playback failed");
        }
    }
}

fn run_quietly(program: &str, args: &[&str], file: &Path) -> bool {
    Command::new(program)
        .args(args)
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
