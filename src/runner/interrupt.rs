use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Ctrl+C state shared between the signal handler and the orchestrator.
///
/// The first signal cancels the current step and lets cleanup run. A second
/// one asks for an immediate exit, e.g. when `adb disconnect` hangs.
#[derive(Debug, Default)]
pub struct Interrupt {
    notify: Notify,
    signalled: AtomicBool,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal. Returns `true` if one was already received.
    pub fn signal(&self) -> bool {
        let repeated = self.signalled.swap(true, Ordering::SeqCst);
        if !repeated {
            self.notify.notify_one();
        }
        repeated
    }

    /// Notified on the first signal
    pub fn notify(&self) -> &Notify {
        &self.notify
    }
}
