use crate::signal::SignalClass;
use async_trait::async_trait;
use std::io;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Where a [`ServiceRuntime`](super::ServiceRuntime) gets its OS signals from.
///
/// `recv` must be cancel safe: it is polled inside `select!` and dropped
/// whenever another source wins. `None` means the source is exhausted and
/// will never yield again.
#[async_trait]
pub trait SignalSource: Send {
    async fn recv(&mut self) -> Option<SignalClass>;
}

/// Signals delivered to this process by the operating system.
///
/// Listeners are registered on construction, so signals that arrive before
/// the first `recv` are not lost.
#[derive(Debug)]
pub struct OsSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    interrupt: tokio::signal::windows::CtrlC,
    #[cfg(windows)]
    terminate: tokio::signal::windows::CtrlBreak,
}

impl OsSignals {
    #[cfg(unix)]
    pub fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        debug!("listening for unix signals");
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn new() -> io::Result<Self> {
        use tokio::signal::windows::{ctrl_break, ctrl_c};

        debug!("listening for windows console events");
        Ok(Self {
            interrupt: ctrl_c()?,
            terminate: ctrl_break()?,
        })
    }
}

#[async_trait]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> Option<SignalClass> {
        let class = tokio::select! {
            Some(()) = self.interrupt.recv() => SignalClass::Interrupt,
            Some(()) = self.terminate.recv() => SignalClass::Terminate,
            else => return None,
        };
        trace!(%class, "received signal");
        Some(class)
    }
}

/// A signal source fed through a channel instead of the OS.
///
/// Useful for tests and for embedding a service in a host that owns the
/// process signals itself.
#[derive(Debug)]
pub struct ChannelSignals {
    receiver: mpsc::UnboundedReceiver<SignalClass>,
}

/// Sending side of [`ChannelSignals`].
#[derive(Debug, Clone)]
pub struct SignalSender {
    sender: mpsc::UnboundedSender<SignalClass>,
}

impl ChannelSignals {
    pub fn new() -> (SignalSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (SignalSender { sender }, Self { receiver })
    }
}

impl SignalSender {
    /// Returns false if the receiving source is gone.
    pub fn send(&self, class: SignalClass) -> bool {
        self.sender.send(class).is_ok()
    }
}

#[async_trait]
impl SignalSource for ChannelSignals {
    async fn recv(&mut self) -> Option<SignalClass> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_signals_in_order() {
        let (sender, mut source) = ChannelSignals::new();
        assert!(sender.send(SignalClass::Interrupt));
        assert!(sender.send(SignalClass::Terminate));

        assert_eq!(source.recv().await, Some(SignalClass::Interrupt));
        assert_eq!(source.recv().await, Some(SignalClass::Terminate));
    }

    #[tokio::test]
    async fn test_channel_signals_exhausted() {
        let (sender, mut source) = ChannelSignals::new();
        drop(sender);
        assert_eq!(source.recv().await, None);
    }

    #[test]
    fn test_send_after_source_dropped() {
        let (sender, source) = ChannelSignals::new();
        drop(source);
        assert!(!sender.send(SignalClass::Terminate));
    }
}
