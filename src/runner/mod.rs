pub mod events;
pub mod interrupt;
pub mod orchestrator;
pub mod retry;
pub mod state;

use crate::driver::android::{adb::AdbBridge, mirror_service::ScrcpyMirror};
use crate::driver::network::PingProbe;
use crate::utils::config::ConnectConfig;
use colored::Colorize;
use tokio::sync::Notify;

pub use events::*;
pub use interrupt::Interrupt;
pub use orchestrator::Orchestrator;
pub use state::*;

/// Connect to the configured device over Wi-Fi and mirror it with scrcpy
pub async fn run_connect(config: ConnectConfig, interrupt: &Notify) -> RunOutcome {
    println!(
        "{} Connecting to {} over Wi-Fi",
        "▶".green().bold(),
        config.target.to_string().cyan()
    );
    log::debug!("config: {:?}", config);

    let orchestrator = Orchestrator::new(
        config,
        Box::new(AdbBridge),
        Box::new(PingProbe),
        Box::new(ScrcpyMirror),
    );
    let outcome = orchestrator.run(interrupt).await;

    match outcome.error() {
        None => println!("\n{} Session finished", "✅".green().bold()),
        Some(err) => report_failure(err),
    }

    outcome
}

/// Print a diagnostic and its remediation hints
pub fn report_failure(err: &crate::error::ConnectError) {
    eprintln!("\n{} {}", "❌".red(), err.to_string().red().bold());
    for hint in err.remediation() {
        eprintln!("   {} {}", "•".yellow(), hint);
    }
}
