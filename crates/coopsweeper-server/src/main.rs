//! Coopsweeper server entrypoint.
//!
//! Configuration comes from the environment (see [`ServerConfig::from_env`]);
//! log verbosity from `RUST_LOG` (default `info`).

use coopsweeper::prelude::*;

#[tokio::main]
async fn main() -> Result<(), CoopsweeperError> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        cursor_throttle_ms = config.cursor_throttle.as_millis() as u64,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "starting coopsweeper"
    );

    let server = CoopsweeperServer::builder().config(config).build().await?;
    server.run_until(shutdown_signal()).await
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
