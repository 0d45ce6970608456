use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the directory that holds `<service>.pid`.
pub const PID_DIR_VAR: &str = "STARTER_PID_DIR";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StarterConfig {
    pub pid_dir: Option<PathBuf>,
    #[serde(default = "default_log")]
    pub log: String,
}

impl StarterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).wrap_err_with(|| format!("Failed to open config {path:?}"))?;
        serde_yaml::from_reader(file).wrap_err("Failed to read config!")
    }

    /// Picks the pid directory: `explicit` (flag or environment), then the
    /// config file, then the platform temporary directory. Empty paths count
    /// as unset.
    pub fn resolve_pid_dir(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .into_iter()
            .chain(self.pid_dir.clone())
            .find(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Settings for an [`MtimeWatcher`](crate::watcher::MtimeWatcher), for
/// services that read them from their own config file.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct WatcherConfig {
    pub paths: Vec<PathBuf>,
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
}

fn default_log() -> String {
    "info".into()
}

fn default_interval() -> Duration {
    Duration::from_secs(15)
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            pid_dir: Default::default(),
            log: default_log(),
        }
    }
}
