//! The in-process half of the supervision protocol.
//!
//! A service creates a [`ServiceRuntime`], calls [`wait`](ServiceRuntime::wait)
//! once near the end of its entry point, and finishes with
//! [`exit_status`](ServiceRuntime::exit_status) (or returns
//! [`exit_code`](ServiceRuntime::exit_code) from `main`) after every other
//! resource has been released. The `starter` supervisor relaunches it when
//! the exit status is [`RESTART`].

mod context;
mod signals;
mod types;

pub use self::context::{RestartHandle, ServiceHandle, SupervisionContext};
pub use self::signals::{ChannelSignals, OsSignals, SignalSender, SignalSource};
pub use self::types::{ExitIntent, ExitStatusCode, RESTART};

use crate::signal::SignalClass;
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Time a second interrupt has to arrive in to mean "stop" instead of "restart".
pub const DEBOUNCE: Duration = Duration::from_secs(2);

pub struct ServiceRuntime<S = OsSignals> {
    context: SupervisionContext,
    signals: S,
}

impl ServiceRuntime<OsSignals> {
    /// Registers OS signal listeners for this process.
    pub fn new() -> io::Result<Self> {
        Ok(Self::with_signals(OsSignals::new()?))
    }
}

impl<S: SignalSource> ServiceRuntime<S> {
    pub fn with_signals(signals: S) -> Self {
        Self {
            context: SupervisionContext::new(),
            signals,
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        self.context.handle()
    }

    pub fn restart_handle(&self) -> RestartHandle {
        self.context.restart_handle()
    }

    /// Waits until the first of the signal source or the stop, error, and
    /// restart channels fires, and records the matching exit status.
    ///
    /// A lone interrupt is held for [`DEBOUNCE`]: a second interrupt (or a
    /// termination signal) inside the window turns it into a stop, otherwise
    /// it becomes a restart.
    ///
    /// This is meant to be called once per process. Taking `&mut self` rules
    /// out concurrent calls; a second sequential call still returns an intent
    /// but cannot change the exit status recorded by the first.
    ///
    /// With `verbose` off, only the final decision is logged.
    #[instrument(skip(self))]
    pub async fn wait(&mut self, verbose: bool) -> ExitIntent {
        let context = &mut self.context;
        let signals = &mut self.signals;

        let intent = tokio::select! {
            Some(class) = signals.recv() => match class {
                SignalClass::Terminate => {
                    if verbose {
                        debug!(%class, "termination requested");
                    }
                    ExitIntent::Stop
                }
                SignalClass::Interrupt => {
                    if verbose {
                        info!(
                            "interrupted, restarting unless interrupted again within {}",
                            humantime::format_duration(DEBOUNCE)
                        );
                    }
                    debounce(signals).await
                }
            },
            Some(()) = context.restart.recv() => ExitIntent::RestartRequested,
            Some(()) = context.stop.recv() => ExitIntent::Stop,
            Some(()) = context.error.recv() => ExitIntent::Error,
        };

        match intent {
            ExitIntent::Stop | ExitIntent::InterruptTwice => info!("Stopping..."),
            ExitIntent::Error => warn!("Stopping due to error..."),
            ExitIntent::RestartRequested | ExitIntent::InterruptOnce => info!("Re-starting..."),
        }

        let status = intent.status();
        if context.exit_status.set(status).is_err() {
            warn!(
                ?intent,
                kept = %self.exit_status_code(),
                "exit status already set by an earlier wait"
            );
        } else if verbose {
            debug!(?intent, %status, "exit status set");
        }

        intent
    }

    /// Status recorded by [`wait`](Self::wait); stop if it never ran.
    pub fn exit_status_code(&self) -> ExitStatusCode {
        self.context.exit_status.get().copied().unwrap_or_default()
    }

    pub fn exit_code(&self) -> ExitCode {
        // Status codes are 0, 1 and 33.
        ExitCode::from(self.exit_status_code().code() as u8)
    }

    /// Exits the process immediately with the recorded status.
    ///
    /// Nothing that is still alive gets dropped, so this has to be the very
    /// last thing the service does.
    pub fn exit_status(&self) -> ! {
        std::process::exit(self.exit_status_code().code())
    }
}

async fn debounce<S: SignalSource>(signals: &mut S) -> ExitIntent {
    let window = tokio::time::sleep(DEBOUNCE);
    tokio::pin!(window);

    // A signal that is ready when the window closes still counts as inside it.
    tokio::select! {
        biased;
        Some(class) = signals.recv() => match class {
            SignalClass::Interrupt => ExitIntent::InterruptTwice,
            SignalClass::Terminate => ExitIntent::Stop,
        },
        _ = &mut window => ExitIntent::InterruptOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn runtime() -> (SignalSender, ServiceRuntime<ChannelSignals>) {
        let (sender, signals) = ChannelSignals::new();
        (sender, ServiceRuntime::with_signals(signals))
    }

    // -- channel sources --

    #[tokio::test]
    async fn test_restart_request() {
        let (_sender, mut runtime) = runtime();
        runtime.handle().restart();

        assert_eq!(runtime.wait(true).await, ExitIntent::RestartRequested);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Restart);
    }

    #[tokio::test]
    async fn test_restart_from_external_source() {
        let (_sender, mut runtime) = runtime();
        let restart = runtime.restart_handle();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            restart.restart();
        });

        assert_eq!(runtime.wait(false).await, ExitIntent::RestartRequested);
        assert_eq!(runtime.exit_status_code().code(), RESTART);
    }

    #[tokio::test]
    async fn test_stop_request() {
        let (_sender, mut runtime) = runtime();
        runtime.handle().stop();

        assert_eq!(runtime.wait(false).await, ExitIntent::Stop);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Stop);
    }

    #[tokio::test]
    async fn test_error_request() {
        let (_sender, mut runtime) = runtime();
        runtime.handle().error();

        assert_eq!(runtime.wait(true).await, ExitIntent::Error);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Error);
        assert_eq!(runtime.exit_status_code().code(), 1);
    }

    // -- signals --

    #[tokio::test]
    async fn test_terminate_signal() {
        let (sender, mut runtime) = runtime();
        sender.send(SignalClass::Terminate);

        assert_eq!(runtime.wait(true).await, ExitIntent::Stop);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_interrupt_restarts() {
        let (sender, mut runtime) = runtime();
        sender.send(SignalClass::Interrupt);

        let started = tokio::time::Instant::now();
        assert_eq!(runtime.wait(true).await, ExitIntent::InterruptOnce);
        assert!(started.elapsed() >= DEBOUNCE);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Restart);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_interrupt_inside_window_stops() {
        let (sender, mut runtime) = runtime();
        let waiter = tokio::spawn(async move {
            let intent = runtime.wait(false).await;
            (intent, runtime.exit_status_code())
        });

        sender.send(SignalClass::Interrupt);
        sleep(Duration::from_millis(1500)).await;
        sender.send(SignalClass::Interrupt);

        let (intent, status) = waiter.await.unwrap();
        assert_eq!(intent, ExitIntent::InterruptTwice);
        assert_eq!(status, ExitStatusCode::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_interrupt_at_window_end_stops() {
        let (sender, mut runtime) = runtime();
        sender.send(SignalClass::Interrupt);

        let intent = {
            let wait = runtime.wait(false);
            tokio::pin!(wait);
            // Poll once so the window opens now.
            assert!(tokio::time::timeout(Duration::ZERO, &mut wait)
                .await
                .is_err());

            tokio::time::advance(DEBOUNCE).await;
            sender.send(SignalClass::Interrupt);
            wait.await
        };
        assert_eq!(intent, ExitIntent::InterruptTwice);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupts_outside_window_restart() {
        let (sender, mut runtime) = runtime();
        let waiter = tokio::spawn(async move {
            let intent = runtime.wait(false).await;
            (intent, runtime.exit_status_code())
        });

        sender.send(SignalClass::Interrupt);
        sleep(Duration::from_millis(2500)).await;
        sender.send(SignalClass::Interrupt);

        let (intent, status) = waiter.await.unwrap();
        assert_eq!(intent, ExitIntent::InterruptOnce);
        assert_eq!(status, ExitStatusCode::Restart);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_inside_window_stops() {
        let (sender, mut runtime) = runtime();
        sender.send(SignalClass::Interrupt);
        sender.send(SignalClass::Terminate);

        assert_eq!(runtime.wait(true).await, ExitIntent::Stop);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_with_exhausted_source() {
        let (sender, mut runtime) = runtime();
        sender.send(SignalClass::Interrupt);
        drop(sender);

        assert_eq!(runtime.wait(false).await, ExitIntent::InterruptOnce);
    }

    #[tokio::test]
    async fn test_exhausted_source_still_waits_for_channels() {
        let (sender, mut runtime) = runtime();
        drop(sender);
        runtime.handle().stop();

        assert_eq!(runtime.wait(false).await, ExitIntent::Stop);
    }

    // -- exit status --

    #[test]
    fn test_default_exit_status() {
        let (_sender, runtime) = runtime();
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Stop);
        assert_eq!(runtime.exit_code(), ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_exit_status_is_write_once() {
        let (_sender, mut runtime) = runtime();
        runtime.handle().error();
        assert_eq!(runtime.wait(false).await, ExitIntent::Error);

        runtime.handle().restart();
        assert_eq!(runtime.wait(false).await, ExitIntent::RestartRequested);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Error);
        assert_eq!(runtime.exit_status_code(), ExitStatusCode::Error);
    }

    #[tokio::test]
    async fn test_pending_requests_survive_wait() {
        let (_sender, mut runtime) = runtime();
        runtime.handle().stop();
        runtime.handle().error();

        let first = runtime.wait(false).await;
        let second = runtime.wait(false).await;
        let mut got = vec![first, second];
        got.sort_by_key(|intent| *intent as u8);
        assert_eq!(got, vec![ExitIntent::Stop, ExitIntent::Error]);
    }
}
