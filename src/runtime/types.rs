use std::fmt;

/// Exit status the supervisor reads as "launch me again".
pub const RESTART: i32 = 33;

/// What a single [`wait`](super::ServiceRuntime::wait) call decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitIntent {
    /// Termination signal or an explicit stop request.
    Stop,
    /// Explicit error request.
    Error,
    /// Explicit restart request, e.g. from a file watcher.
    RestartRequested,
    /// One interrupt and nothing else inside the debounce window.
    InterruptOnce,
    /// Two interrupts inside the debounce window.
    InterruptTwice,
}

impl ExitIntent {
    pub fn status(self) -> ExitStatusCode {
        match self {
            ExitIntent::Stop | ExitIntent::InterruptTwice => ExitStatusCode::Stop,
            ExitIntent::Error => ExitStatusCode::Error,
            ExitIntent::RestartRequested | ExitIntent::InterruptOnce => ExitStatusCode::Restart,
        }
    }
}

/// Process exit status of a supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitStatusCode {
    #[default]
    Stop,
    Error,
    Restart,
}

impl ExitStatusCode {
    pub const fn code(self) -> i32 {
        match self {
            ExitStatusCode::Stop => 0,
            ExitStatusCode::Error => 1,
            ExitStatusCode::Restart => RESTART,
        }
    }
}

impl fmt::Display for ExitStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
