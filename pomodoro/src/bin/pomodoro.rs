// pomodoro: command-line client for pomodoro-daemon
//
// Commands:
//   pomodoro [toggle]   start, pause or resume the timer
//   pomodoro status     print `<PHASE> <seconds> <done>/<total> <status>`
//   pomodoro skip       jump to the next phase
//   pomodoro reset      return to idle
//   pomodoro stop       shut the daemon down

use clap::{Parser, Subcommand};
use pomodoro_lib::timer::{
    config::Config,
    daemon_client::{send_command, send_to_running},
    protocol::{Command, Response},
};
use std::process::ExitCode;

/// Pomodoro timer controlled through a background daemon.
#[derive(Parser)]
#[command(name = "pomodoro", version, about)]
struct Cli {
    /// Command to send; defaults to toggle.
    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand, Clone, Copy)]
enum Action {
    /// Start a work session, or pause/resume the running one.
    Toggle,
    /// Show the current phase and remaining time.
    Status,
    /// Skip to the next phase.
    Skip,
    /// Stop the timer and clear the session counter.
    Reset,
    /// Shut down the daemon.
    Stop,
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Toggle => Command::Toggle,
            Action::Status => Command::Status,
            Action::Skip => Command::Skip,
            Action::Reset => Command::Reset,
            Action::Stop => Command::Stop,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let command = Command::from(cli.command.unwrap_or(Action::Toggle));
    let config = Config::from_env();

    // Stopping should never start a daemon just to kill it
    let result = match command {
        Command::Stop => send_to_running(&config, command),
        _ => send_command(&config, command),
    };

    match result {
        Ok(reply) => {
            println!("{}", reply);
            if reply.parse::<Response>().is_ok_and(|r| r.is_err()) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
