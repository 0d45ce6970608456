use std::fmt;

/// The two kinds of OS signal the supervision protocol cares about.
///
/// On Unix, [`Interrupt`][SignalClass::Interrupt] is `SIGINT` and
/// [`Terminate`][SignalClass::Terminate] is `SIGTERM`. On Windows they are
/// `Ctrl+C` and `Ctrl+Break`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalClass {
    /// Operator interrupt. Once means restart, twice in a row means stop.
    Interrupt,
    /// Termination request. Always means stop.
    Terminate,
}

impl SignalClass {
    #[cfg(unix)]
    pub fn to_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal;

        match self {
            SignalClass::Interrupt => Signal::SIGINT,
            SignalClass::Terminate => Signal::SIGTERM,
        }
    }
}

impl fmt::Display for SignalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if cfg!(windows) {
            match self {
                SignalClass::Interrupt => "Ctrl+C",
                SignalClass::Terminate => "Ctrl+Break",
            }
        } else {
            match self {
                SignalClass::Interrupt => "SIGINT",
                SignalClass::Terminate => "SIGTERM",
            }
        };
        f.write_str(name)
    }
}
