use super::event_handlers::handle_exit_event;
use super::pidfile::PidFile;
use super::types::ChildExit;
use super::Service;
use crate::error::{Result, SupervisorError};
use std::io;
use std::process::ExitStatus;
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument};

/// Runs the service until it exits with anything but the restart status,
/// and returns that exit code.
///
/// The pid file stays open for the whole loop and is rewritten with every
/// new child's pid. It is removed whenever the loop ends, errors included.
#[instrument(skip(service), fields(service = %service.name))]
pub async fn launch_loop(service: &Service) -> Result<i32> {
    let mut pid_file = PidFile::create(&service.pid_file, &service.name)?;
    let mut relay = SignalRelay::new()?;
    println!(" * Starting {} service", service.name);

    loop {
        let (mut child, pid) = start(service)?;
        pid_file.rewrite(pid)?;

        let status = relay
            .wait_child(&mut child, pid)
            .await
            .map_err(|source| SupervisorError::Wait { pid, source })?;

        match handle_exit_event(pid, status) {
            ChildExit::Relaunch => {
                debug!(path = ?pid_file.path(), "relaunching with the same pid file");
            }
            ChildExit::Terminate { exit_code } => {
                pid_file.release()?;
                return Ok(exit_code);
            }
        }
    }
}

/// Returns the started child and its pid.
fn start(service: &Service) -> Result<(Child, u32)> {
    let spawn_error = |source| SupervisorError::Spawn {
        program: service.program.clone(),
        source,
    };

    // Standard streams and environment are inherited. The child is killed
    // if the loop bails out with an error while it is still running.
    let child = Command::new(&service.program)
        .args(&service.args)
        .kill_on_drop(true)
        .spawn()
        .map_err(spawn_error)?;
    let pid = child
        .id()
        .ok_or_else(|| spawn_error(io::Error::new(io::ErrorKind::Other, "child exited instantly")))?;

    info!("Child started: {}", pid);
    Ok((child, pid))
}

/// Keeps the supervisor alive through interrupts, which the terminal already
/// delivers to the child, and passes termination requests on to the child.
struct SignalRelay {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    interrupt: tokio::signal::windows::CtrlC,
}

impl SignalRelay {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(SupervisorError::SignalHandler)?,
            terminate: signal(SignalKind::terminate()).map_err(SupervisorError::SignalHandler)?,
        })
    }

    #[cfg(windows)]
    fn new() -> Result<Self> {
        Ok(Self {
            interrupt: tokio::signal::windows::ctrl_c().map_err(SupervisorError::SignalHandler)?,
        })
    }

    #[cfg(unix)]
    async fn wait_child(&mut self, child: &mut Child, pid: u32) -> io::Result<ExitStatus> {
        use crate::signal::SignalClass;
        use tracing::warn;

        loop {
            tokio::select! {
                status = child.wait() => return status,
                Some(()) = self.interrupt.recv() => {
                    debug!(pid, "interrupt left to the child");
                }
                Some(()) = self.terminate.recv() => {
                    info!(pid, "Forwarding termination to child");
                    if let Err(err) = super::deliver(pid, SignalClass::Terminate) {
                        warn!(?err, "Failed to forward signal");
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn wait_child(&mut self, child: &mut Child, pid: u32) -> io::Result<ExitStatus> {
        loop {
            tokio::select! {
                status = child.wait() => return status,
                Some(()) = self.interrupt.recv() => {
                    debug!(pid, "interrupt left to the child");
                }
            }
        }
    }
}
