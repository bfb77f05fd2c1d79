// pomodoro-daemon: background process owning the timer
// Listens on a Unix socket; start it directly or let the `pomodoro` CLI spawn it

use anyhow::{Context, Result};
use pomodoro_lib::timer::{
    activity::XprintidleProbe,
    config::Config,
    engine::Engine,
    notify::{notice_channel, run_notifier, DesktopDispatcher},
    server::{shutdown_on_signals, Server},
    settings::Settings,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout and stderr are discarded when the CLI spawns us; logs still go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load();
    let config = Config::from_env();

    let (notices, notice_rx) = notice_channel();
    let notifier = tokio::spawn(run_notifier(
        notice_rx,
        Arc::new(DesktopDispatcher::new(&settings)),
    ));

    let engine = Engine::new(
        settings.durations(),
        settings.total_sessions(),
        notices,
        Arc::new(XprintidleProbe::default()),
    );

    let server = Server::bind(config.clone(), engine.clone())
        .with_context(|| format!("Failed to start daemon on {}", config.socket_path.display()))?;
    shutdown_on_signals(engine.shutdown_token());

    server.run().await.context("Daemon failed")?;

    // Dropping the last engine handle closes the notice queue
    drop(engine);
    if tokio::time::timeout(std::time::Duration::from_secs(2), notifier).await.is_err() {
        tracing::debug!("pending notices dropped at exit");
    }
    Ok(())
}
