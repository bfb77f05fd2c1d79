//! Integration test: wire protocol against an in-process daemon
//!
//! Each test binds a real Unix socket in a temp dir and talks to it with
//! the same client code the CLI uses.
//!
//! Run with: cargo test --test daemon_protocol

use pomodoro_lib::test_utils::assert_eventually_bool;
use pomodoro_lib::timer::{
    activity::{IdleProbe, ProbeError},
    config::Config,
    daemon_client::send_to_running,
    engine::Engine,
    notify::{notice_channel, Notice, NoticeReceiver},
    protocol::{encode_command, Command, Phase, Response, RunStatus, StatusLine},
    server::{Server, ServerError},
    settings::Durations,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

/// Reports a long idle time forever, so activity never fires
struct AwayFromKeyboard;

impl IdleProbe for AwayFromKeyboard {
    fn idle_millis(&self) -> Result<u64, ProbeError> {
        Ok(600_000)
    }
}

struct TestDaemon {
    config: Config,
    engine: Engine,
    notices: NoticeReceiver,
    task: JoinHandle<Result<(), ServerError>>,
    _dir: TempDir,
}

fn start_daemon(durations: Durations, total_sessions: u32) -> TestDaemon {
    let dir = TempDir::new().unwrap();
    let config = Config::in_dir(dir.path().join("run"));
    let (tx, notices) = notice_channel();
    let engine = Engine::new(durations, total_sessions, tx, Arc::new(AwayFromKeyboard));
    let server = Server::bind(config.clone(), engine.clone()).unwrap();
    let task = tokio::spawn(server.run());

    TestDaemon {
        config,
        engine,
        notices,
        task,
        _dir: dir,
    }
}

/// Blocking client call, run off the async workers
async fn send(config: &Config, command: Command) -> String {
    let config = config.clone();
    tokio::task::spawn_blocking(move || send_to_running(&config, command))
        .await
        .unwrap()
        .unwrap()
}

/// STATUS parsed into its fields; the countdown may have moved by a tick
async fn status_of(config: &Config) -> StatusLine {
    match send(config, Command::Status).await.parse::<Response>() {
        Ok(Response::Status(line)) => line,
        other => panic!("expected a status line, got {other:?}"),
    }
}

async fn send_raw(config: &Config, request: &str) -> String {
    let mut stream = UnixStream::connect(&config.socket_path).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn test_toggle_status_pause_resume() {
    let daemon = start_daemon(Durations::default(), 3);

    assert_eq!(send(&daemon.config, Command::Status).await, "IDLE 0 0/3 stopped");
    assert_eq!(send(&daemon.config, Command::Toggle).await, "OK started");
    assert_eq!(send(&daemon.config, Command::Toggle).await, "OK paused");

    let paused = status_of(&daemon.config).await;
    assert_eq!(paused.phase, Phase::Work);
    assert_eq!(paused.status, RunStatus::Paused);
    assert!(paused.seconds_remaining <= 1500);

    // Paused time does not count down
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(status_of(&daemon.config).await, paused);

    assert_eq!(send(&daemon.config, Command::Toggle).await, "OK running");
    assert_eq!(status_of(&daemon.config).await.status, RunStatus::Running);
}

#[tokio::test]
async fn test_protocol_errors_leave_state_alone() {
    let daemon = start_daemon(Durations::default(), 3);

    assert_eq!(send(&daemon.config, Command::Skip).await, "ERR No active timer");
    assert_eq!(send_raw(&daemon.config, "pause\n").await, "ERR Unknown command\n");
    assert_eq!(send_raw(&daemon.config, "\n").await, "ERR Unknown command\n");
    assert_eq!(send(&daemon.config, Command::Status).await, "IDLE 0 0/3 stopped");
}

#[tokio::test]
async fn test_case_insensitive_requests() {
    let daemon = start_daemon(Durations::default(), 3);

    assert_eq!(send_raw(&daemon.config, "  ToGgLe \r\n").await, "OK started\n");
    assert_eq!(send_raw(&daemon.config, "reset\n").await, "OK idle\n");
}

#[tokio::test]
async fn test_skip_walks_the_cycle() {
    let daemon = start_daemon(Durations::default(), 2);

    send(&daemon.config, Command::Toggle).await;
    assert_eq!(send(&daemon.config, Command::Skip).await, "OK SHORT_BREAK");
    assert_eq!(send(&daemon.config, Command::Skip).await, "OK WAITING_WORK");
    assert_eq!(send(&daemon.config, Command::Status).await, "WAITING_WORK 0 1/2 waiting");
    assert_eq!(send(&daemon.config, Command::Skip).await, "OK WORK");
    assert_eq!(send(&daemon.config, Command::Skip).await, "OK LONG_BREAK");
    let long_break = status_of(&daemon.config).await;
    assert_eq!(long_break.phase, Phase::LongBreak);
    assert_eq!((long_break.completed_sessions, long_break.total_sessions), (2, 2));
    assert_eq!(send(&daemon.config, Command::Skip).await, "OK WAITING_WORK");
    assert_eq!(send(&daemon.config, Command::Status).await, "WAITING_WORK 0 0/2 waiting");
    assert_eq!(send(&daemon.config, Command::Reset).await, "OK idle");
}

#[tokio::test]
async fn test_concurrent_clients_are_serialized() {
    let daemon = start_daemon(Durations::default(), 3);

    let mut clients = Vec::new();
    for _ in 0..10 {
        let config = daemon.config.clone();
        clients.push(tokio::spawn(async move { send(&config, Command::Toggle).await }));
    }

    let mut replies = Vec::new();
    for client in clients {
        replies.push(client.await.unwrap());
    }

    // One start, then strictly alternating pause/resume
    assert_eq!(replies.iter().filter(|r| *r == "OK started").count(), 1);
    assert_eq!(replies.iter().filter(|r| *r == "OK paused").count(), 5);
    assert_eq!(replies.iter().filter(|r| *r == "OK running").count(), 4);
    let status = status_of(&daemon.config).await;
    assert_eq!((status.phase, status.status), (Phase::Work, RunStatus::Paused));
}

#[tokio::test]
async fn test_countdown_completion_notifies() {
    let durations = Durations {
        work_secs: 2,
        short_break_secs: 60,
        long_break_secs: 60,
    };
    let mut daemon = start_daemon(durations, 3);

    send(&daemon.config, Command::Toggle).await;

    let engine = daemon.engine.clone();
    assert_eventually_bool(
        "work phase to complete",
        Duration::from_secs(5),
        Duration::from_millis(50),
        || {
            let engine = engine.clone();
            async move { engine.snapshot().await.completed_sessions == 1 }
        },
    )
    .await;

    assert_eq!(
        daemon.notices.recv().await,
        Some(Notice::Message("Work Complete! Time for a short break.".to_string()))
    );
}

#[tokio::test]
async fn test_stop_replies_then_removes_socket() {
    let daemon = start_daemon(Durations::default(), 3);
    let socket = daemon.config.socket_path.clone();
    assert!(socket.exists());

    assert_eq!(send(&daemon.config, Command::Stop).await, "OK");

    tokio::time::timeout(Duration::from_secs(5), daemon.task)
        .await
        .expect("daemon should stop after STOP")
        .unwrap()
        .unwrap();
    assert!(!socket.exists());
}

#[tokio::test]
async fn test_second_daemon_refuses_occupied_socket() {
    let daemon = start_daemon(Durations::default(), 3);

    let (tx, _rx) = notice_channel();
    let engine = Engine::new(Durations::default(), 3, tx, Arc::new(AwayFromKeyboard));
    let err = Server::bind(daemon.config.clone(), engine).err().unwrap();
    assert!(matches!(err, ServerError::AlreadyRunning { .. }));
    assert!(err.to_string().contains("pomodoro.sock"));

    // The first daemon keeps serving
    assert_eq!(send(&daemon.config, Command::Status).await, "IDLE 0 0/3 stopped");
}

#[test]
fn test_encoded_commands_are_single_lines() {
    for command in [Command::Toggle, Command::Status, Command::Skip, Command::Reset, Command::Stop] {
        let line = encode_command(command);
        assert!(line.ends_with('\n'));
        assert_eq!(line.trim().parse::<Command>(), Ok(command));
    }
}
