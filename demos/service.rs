//! A service meant to be run under `starter`.
//!
//! Ctrl-C restarts it, Ctrl-C twice stops it, and rebuilding the binary
//! restarts it too.
//!
//! ```text
//! cargo build --example service
//! starter target/debug/examples/service
//! ```

use starter::configs::WatcherConfig;
use starter::watcher::MtimeWatcher;
use starter::ServiceRuntime;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

fn main() -> ExitCode {
    // Everything the service owns is dropped inside `serve`, the exit code
    // is the last thing left.
    match serve() {
        Ok(runtime) => runtime.exit_code(),
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn serve() -> color_eyre::Result<ServiceRuntime> {
    color_eyre::install()?;
    starter::logging::init("info", false);

    let mut runtime = ServiceRuntime::new()?;

    let watched = std::env::current_exe()?;
    let watcher = MtimeWatcher::new(
        WatcherConfig {
            paths: vec![watched],
            interval: Duration::from_secs(2),
        },
        runtime.restart_handle(),
    );
    if let Err(err) = watcher.start().await {
        warn!(?err, "Not watching the service binary");
    }

    let ticker = tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            info!(pid = std::process::id(), "serving");
        }
    });

    let intent = runtime.wait(true).await;
    ticker.abort();
    info!(?intent, code = %runtime.exit_status_code(), "shutting down");
    Ok(runtime)
}
