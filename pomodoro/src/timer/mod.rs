// Pomodoro timer module (shared between the daemon and the CLI)
// State machine, scheduling, and the Unix socket protocol around it

pub mod activity;
pub mod config;
pub mod daemon_client;
pub mod engine;
pub mod notify;
pub mod protocol;
pub mod server;
pub mod settings;
pub mod state;
pub mod task;
pub mod ticker;
