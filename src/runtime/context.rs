use super::types::ExitStatusCode;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, OnceCell};
use tracing::trace;

/// Channels and exit status owned by one [`ServiceRuntime`](super::ServiceRuntime).
///
/// Each channel holds at most one pending request; sending while one is
/// already pending is a no-op. The runtime keeps a sender of every channel
/// alive, so they never close while it exists.
#[derive(Debug)]
pub struct SupervisionContext {
    handle: ServiceHandle,
    pub(super) stop: mpsc::Receiver<()>,
    pub(super) error: mpsc::Receiver<()>,
    pub(super) restart: mpsc::Receiver<()>,
    pub(super) exit_status: OnceCell<ExitStatusCode>,
}

impl SupervisionContext {
    pub fn new() -> Self {
        let (stop_sender, stop) = mpsc::channel(1);
        let (error_sender, error) = mpsc::channel(1);
        let (restart_sender, restart) = mpsc::channel(1);

        Self {
            handle: ServiceHandle {
                stop: stop_sender,
                error: error_sender,
                restart: RestartHandle {
                    sender: restart_sender,
                },
            },
            stop,
            error,
            restart,
            exit_status: OnceCell::new(),
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    pub fn restart_handle(&self) -> RestartHandle {
        self.handle.restart.clone()
    }
}

impl Default for SupervisionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lets the service's own logic end the current `wait`.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    stop: mpsc::Sender<()>,
    error: mpsc::Sender<()>,
    restart: RestartHandle,
}

impl ServiceHandle {
    pub fn stop(&self) {
        push(&self.stop, "stop");
    }

    pub fn error(&self) {
        push(&self.error, "error");
    }

    pub fn restart(&self) {
        self.restart.restart();
    }
}

/// Restart-only handle, given to external restart sources such as
/// [`MtimeWatcher`](crate::watcher::MtimeWatcher).
#[derive(Debug, Clone)]
pub struct RestartHandle {
    sender: mpsc::Sender<()>,
}

impl RestartHandle {
    pub fn restart(&self) {
        push(&self.sender, "restart");
    }
}

fn push(sender: &mpsc::Sender<()>, name: &'static str) {
    match sender.try_send(()) {
        Ok(()) => trace!(request = name, "queued"),
        Err(TrySendError::Full(())) => trace!(request = name, "already pending"),
        Err(TrySendError::Closed(())) => trace!(request = name, "runtime gone"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_are_coalesced() {
        let mut context = SupervisionContext::new();
        let handle = context.handle();
        handle.restart();
        handle.restart();
        context.restart_handle().restart();

        assert!(context.restart.try_recv().is_ok());
        assert!(context.restart.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let mut context = SupervisionContext::new();
        context.handle().error();

        assert!(context.stop.try_recv().is_err());
        assert!(context.restart.try_recv().is_err());
        assert!(context.error.try_recv().is_ok());
    }

    #[test]
    fn test_send_after_context_dropped() {
        let context = SupervisionContext::new();
        let handle = context.handle();
        drop(context);
        handle.stop();
    }
}
