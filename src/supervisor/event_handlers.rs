use super::types::ChildExit;
use crate::runtime::RESTART;
use std::process::ExitStatus;
use tracing::{error, info, warn};

/// Decides what the launch loop does with a child that just exited.
///
/// The restart status relaunches; anything else ends the loop with that
/// status. A child killed by a signal ends it with `128 + signal`.
pub fn handle_exit_event(pid: u32, status: ExitStatus) -> ChildExit {
    match status.code() {
        Some(RESTART) => {
            info!(pid, "Child asked to be restarted");
            ChildExit::Relaunch
        }
        Some(0) => {
            info!(pid, "Child exited with code 0");
            ChildExit::Terminate { exit_code: 0 }
        }
        Some(exit_code) => {
            warn!(pid, "Child exited with non-zero exit code {}", exit_code);
            ChildExit::Terminate { exit_code }
        }
        None => {
            let exit_code = signal_exit_code(status);
            error!(pid, exit_code, "Child was killed by a signal");
            ChildExit::Terminate { exit_code }
        }
    }
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status.signal().map_or(1, |signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i32 {
    1
}
