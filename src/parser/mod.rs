pub mod output;

pub use output::{ConnectOutcome, Device, SessionState};
