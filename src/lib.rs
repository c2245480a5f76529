pub mod driver;
pub mod error;
pub mod parser;
pub mod runner;
pub mod utils;

// Re-export common items
pub use driver::list_devices;
pub use error::ConnectError;
pub use runner::{run_connect, RunOutcome};
pub use utils::config::ConnectConfig;
