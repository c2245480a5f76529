use crate::error::ConnectError;
use std::fmt;

/// Progress of a single connect run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Reachable,
    WiredReleased,
    WirelessUp,
    Verified,
    Mirroring,
    Done,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }

    /// Whether `next` is a legal transition from this state
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Aborted {
            return true;
        }
        matches!(
            (self, next),
            (Start, Reachable)
                | (Reachable, WiredReleased)
                | (Reachable, WirelessUp)
                | (WiredReleased, WirelessUp)
                | (WirelessUp, Verified)
                | (Verified, Mirroring)
                | (Mirroring, Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "START",
            RunState::Reachable => "REACHABLE",
            RunState::WiredReleased => "WIRED_RELEASED",
            RunState::WirelessUp => "WIRELESS_UP",
            RunState::Verified => "VERIFIED",
            RunState::Mirroring => "MIRRORING",
            RunState::Done => "DONE",
            RunState::Aborted => "ABORTED",
        };
        write!(f, "{}", name)
    }
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted(ConnectError),
}

impl RunOutcome {
    /// Process exit code: 0 on completion, 1 on any unrecoverable failure
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Aborted(_) => 1,
        }
    }

    pub fn error(&self) -> Option<&ConnectError> {
        match self {
            RunOutcome::Completed => None,
            RunOutcome::Aborted(err) => Some(err),
        }
    }
}
