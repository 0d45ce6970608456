//! The external half of the supervision protocol: the `starter` control
//! program's operations.

mod event_handlers;
mod pidfile;
mod run;
mod types;

pub use self::event_handlers::handle_exit_event;
pub use self::pidfile::{read_pid, PidFile};
pub use self::run::launch_loop;
pub use self::types::{ChildExit, ServiceStatus, SupervisorCommand};

use crate::error::{Result, SupervisorError};
use crate::signal::SignalClass;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// A service as named on the command line.
#[derive(Debug, Clone)]
pub struct Service {
    /// File name of the program; names the pid file.
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub pid_file: PathBuf,
}

impl Service {
    pub fn new(program: &Path, args: Vec<OsString>, pid_dir: &Path) -> Result<Self> {
        let name = program
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SupervisorError::InvalidService(program.to_path_buf()))?
            .to_string();
        let pid_file = pid_dir.join(format!("{name}.pid"));

        Ok(Self {
            name,
            program: program.to_path_buf(),
            args,
            pid_file,
        })
    }
}

/// Runs `command` for `service` and returns the exit code the supervisor
/// should finish with.
pub async fn dispatch(command: SupervisorCommand, service: &Service) -> Result<i32> {
    match command {
        SupervisorCommand::Start => launch_loop(service).await,
        SupervisorCommand::Restart => {
            restart(service)?;
            println!(" * Restarting {} service", service.name);
            Ok(0)
        }
        SupervisorCommand::Stop => {
            stop(service)?;
            println!(" * Stopping {} service", service.name);
            Ok(0)
        }
        SupervisorCommand::Status => {
            match status(service) {
                ServiceStatus::Running => println!("{}: running", service.name),
                ServiceStatus::NotRunning => println!("{}: not running", service.name),
            }
            Ok(0)
        }
    }
}

/// Reports whether a pid file exists. The recorded process is not probed, so
/// a stale file from a crashed run still reads as running.
pub fn status(service: &Service) -> ServiceStatus {
    match fs::metadata(&service.pid_file) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ServiceStatus::NotRunning,
        Err(err) => {
            debug!(?err, path = ?service.pid_file, "pid file not readable, assuming running");
            ServiceStatus::Running
        }
        Ok(_) => ServiceStatus::Running,
    }
}

/// Sends a termination signal to the recorded process. Returns its pid.
pub fn stop(service: &Service) -> Result<u32> {
    signal_service(service, SignalClass::Terminate)
}

/// Sends an interrupt to the recorded process, which its runtime reads as a
/// restart request. Returns its pid.
pub fn restart(service: &Service) -> Result<u32> {
    signal_service(service, SignalClass::Interrupt)
}

#[instrument(skip(service), fields(service = %service.name))]
fn signal_service(service: &Service, signal: SignalClass) -> Result<u32> {
    let pid = read_pid(&service.pid_file, &service.name)?;
    debug!(pid, path = ?service.pid_file, "read pid file");
    deliver(pid, signal)?;
    info!(pid, %signal, "Signal delivered");
    Ok(pid)
}

/// Delivers `signal` to the process `pid`.
#[cfg(unix)]
pub fn deliver(pid: u32, signal: SignalClass) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| SupervisorError::ProcessNotFound { pid })?;
    match kill(Pid::from_raw(raw), signal.to_nix()) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(SupervisorError::ProcessNotFound { pid }),
        Err(errno) => Err(SupervisorError::SignalDelivery {
            pid,
            signal,
            source: std::io::Error::from_raw_os_error(errno as i32),
        }),
    }
}

#[cfg(not(unix))]
pub fn deliver(pid: u32, signal: SignalClass) -> Result<()> {
    Err(SupervisorError::SignalDelivery {
        pid,
        signal,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "signals can only be delivered on unix",
        ),
    })
}
