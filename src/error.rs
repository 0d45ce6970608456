use crate::signal::SignalClass;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Everything the supervisor can fail with.
///
/// None of these are retried. Only a child exiting with the restart status
/// causes a relaunch.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("invalid service path: {0:?}")]
    InvalidService(PathBuf),

    #[error("{service}: no pid file at {path:?}")]
    PidFileMissing { service: String, path: PathBuf },

    #[error("failed to read pid file {path:?}")]
    PidFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("pid file {path:?} does not hold a process id: {content:?}")]
    PidFileInvalid { path: PathBuf, content: String },

    #[error("{service} service is already running (remove {path:?} if it is stale)")]
    AlreadyRunning { service: String, path: PathBuf },

    #[error("no process with pid {pid}")]
    ProcessNotFound { pid: u32 },

    #[error("failed to deliver {signal} to pid {pid}")]
    SignalDelivery {
        pid: u32,
        signal: SignalClass,
        #[source]
        source: io::Error,
    },

    #[error("could not execute {program:?}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for child {pid}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to update pid file {path:?}")]
    PidFileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen for signals")]
    SignalHandler(#[source] io::Error),
}
