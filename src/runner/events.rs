use super::state::RunState;
use tokio::sync::broadcast;

/// Events emitted while a connect run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    StateChanged { from: RunState, to: RunState },
    /// Non-fatal condition, e.g. "already connected"
    Warning { message: String },
    /// A step failed once and is about to be retried after recovery
    Retrying { step: String, reason: String },
    CleanupFinished { success: bool },
}

/// Broadcast sender for run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}
