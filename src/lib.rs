//! Start, restart, and stop a long-running service.
//!
//! The service links [`ServiceRuntime`] and waits on it; the `starter`
//! binary launches the service, records its pid, turns operator commands into
//! signals, and relaunches the service whenever it exits with [`RESTART`].
//!
//! ```no_run
//! use starter::ServiceRuntime;
//! use std::process::ExitCode;
//!
//! fn main() -> ExitCode {
//!     let runtime = serve();
//!     runtime.exit_code()
//! }
//!
//! #[tokio::main]
//! async fn serve() -> ServiceRuntime {
//!     starter::logging::init("info", false);
//!     let mut runtime = ServiceRuntime::new().expect("signal listeners");
//!     // ... start serving, hand runtime.handle() to the service logic ...
//!     runtime.wait(false).await;
//!     runtime
//! }
//! ```

pub mod configs;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod signal;
pub mod supervisor;
pub mod watcher;

pub use error::SupervisorError;
pub use runtime::{ExitIntent, ExitStatusCode, ServiceRuntime, RESTART};
pub use signal::SignalClass;
