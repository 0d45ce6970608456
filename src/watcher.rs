use crate::configs::WatcherConfig;
use crate::runtime::RestartHandle;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Polls modification times and asks the service to restart once one
/// changes.
///
/// It only ever sends restart requests; stopping is left to the service and
/// to signals.
#[derive(Debug)]
pub struct MtimeWatcher {
    paths: Vec<PathBuf>,
    interval: Duration,
    restart: RestartHandle,
}

impl MtimeWatcher {
    pub fn new(config: WatcherConfig, restart: RestartHandle) -> Self {
        Self {
            paths: config.paths,
            interval: config.interval,
            restart,
        }
    }

    /// Records the current modification times and starts polling.
    ///
    /// Fails if any path cannot be read now. Read errors while polling only
    /// skip that round. The task finishes after the first restart request.
    pub async fn start(self) -> io::Result<JoinHandle<()>> {
        let initial = mtimes(&self.paths).await?;
        debug!(paths = ?self.paths, "watching for changes");

        let span = info_span!("mtime_watcher", interval = %humantime::format_duration(self.interval));
        Ok(tokio::spawn(self.poll(initial).instrument(span)))
    }

    async fn poll(self, initial: Vec<SystemTime>) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let current = match mtimes(&self.paths).await {
                Ok(current) => current,
                Err(err) => {
                    warn!(?err, "Failed to read modification times");
                    continue;
                }
            };

            if let Some(path) = changed(&self.paths, &initial, &current) {
                info!(?path, "modified, requesting restart");
                self.restart.restart();
                return;
            }
        }
    }
}

async fn mtimes(paths: &[PathBuf]) -> io::Result<Vec<SystemTime>> {
    let mut times = Vec::with_capacity(paths.len());
    for path in paths {
        times.push(tokio::fs::metadata(path).await?.modified()?);
    }
    Ok(times)
}

fn changed<'a>(paths: &'a [PathBuf], old: &[SystemTime], new: &[SystemTime]) -> Option<&'a Path> {
    paths
        .iter()
        .zip(old.iter().zip(new))
        .find(|(_, (before, after))| before != after)
        .map(|(path, _)| path.as_path())
}
