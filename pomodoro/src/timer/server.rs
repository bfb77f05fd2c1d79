// Unix socket command server for the daemon
// One request line in, one response line out, then the connection closes

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::timer::config::Config;
use crate::timer::engine::Engine;
use crate::timer::protocol::{encode_response, Command, Response, MAX_REQUEST_LINE_SIZE};
use crate::timer::ticker::spawn_ticker;

/// How long a client may take to send its request line
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The socket path is occupied; no staleness check is made
    #[error("daemon already running (socket exists at {})", path.display())]
    AlreadyRunning { path: PathBuf },
    #[error("failed to bind socket {}: {source}", path.display())]
    Bind { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct Server {
    config: Config,
    listener: UnixListener,
    engine: Engine,
}

impl Server {
    /// Create the listening socket. Must be called inside a tokio runtime.
    pub fn bind(config: Config, engine: Engine) -> Result<Self, ServerError> {
        if config.socket_exists() {
            return Err(ServerError::AlreadyRunning {
                path: config.socket_path.clone(),
            });
        }

        config.ensure_dirs()?;

        let listener = UnixListener::bind(&config.socket_path).map_err(|source| ServerError::Bind {
            path: config.socket_path.clone(),
            source,
        })?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&config.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(Self {
            config,
            listener,
            engine,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Serve until the engine's shutdown token is cancelled, then clean up
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            config,
            listener,
            engine,
        } = self;
        let shutdown = engine.shutdown_token();
        let ticker = spawn_ticker(engine.clone());

        tracing::info!(socket = %config.socket_path.display(), "daemon listening");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                result = listener.accept() => match result {
                    Ok((stream, _addr)) => {
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(engine, stream).await {
                                tracing::warn!(error = %e, "client error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept error"),
                },
            }
        }

        tracing::info!("shutting down daemon");
        drop(ticker.stop());
        engine.stop_activity_monitor().await;
        drop(listener);
        if let Err(e) = config.remove_socket() {
            tracing::warn!(error = %e, socket = %config.socket_path.display(), "failed to remove socket");
        }
        tracing::info!("daemon stopped");
        Ok(())
    }
}

/// Serve exactly one request on `stream`
async fn handle_connection(engine: Engine, mut stream: UnixStream) -> io::Result<()> {
    let (reader, mut writer) = stream.split();
    // One extra byte lets an over-long line be told apart from one at the cap
    let mut reader = BufReader::new(reader.take(MAX_REQUEST_LINE_SIZE as u64 + 1));
    let mut buf = Vec::new();

    let read = tokio::time::timeout(REQUEST_TIMEOUT, reader.read_until(b'\n', &mut buf)).await;
    match read {
        Err(_) => {
            tracing::debug!("client sent no request before timeout");
            return Ok(());
        }
        Ok(Err(e)) => return Err(e),
        Ok(Ok(0)) => return Ok(()),
        Ok(Ok(_)) => {}
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }

    let response = if buf.len() > MAX_REQUEST_LINE_SIZE {
        Response::err("Request too large")
    } else {
        let line = String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        match line.parse::<Command>() {
            Ok(command) => engine.dispatch(command).await,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting request");
                Response::err("Unknown command")
            }
        }
    };

    writer.write_all(encode_response(&response).as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM
pub fn shutdown_on_signals(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "cannot listen for interrupt");
                    return;
                }
                tracing::info!("interrupt received");
            }
            _ = terminate_signal() => tracing::info!("termination signal received"),
        }
        token.cancel();
    });
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
