use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use lumi_mirror::utils::config::{ConnectConfig, TargetAddress};
use lumi_mirror::runner::Interrupt;
use lumi_mirror::{driver, runner};

#[derive(Parser)]
#[command(name = "lumi-mirror")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(
    about = "Connect an Android device over Wi-Fi debugging and mirror it with scrcpy",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect over Wi-Fi and start mirroring (default)
    Connect {
        /// Device address (ip:port), overrides the config file
        #[arg(short, long)]
        address: Option<String>,

        /// Config file (default: ~/.lumi-tester/mirror.yaml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List adb sessions
    Devices,

    /// Disconnect the wireless session
    Disconnect {
        /// Device address (ip:port), overrides the config file
        #[arg(short, long)]
        address: Option<String>,

        /// Config file (default: ~/.lumi-tester/mirror.yaml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_config(address: Option<String>, config: Option<PathBuf>) -> anyhow::Result<ConnectConfig> {
    let mut loaded = ConnectConfig::load(config.as_deref())?;
    if let Some(address) = address {
        loaded = loaded.with_target(address.parse::<TargetAddress>()?);
    }
    Ok(loaded)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Connect {
        address: None,
        config: None,
    });

    match command {
        Commands::Connect { address, config } => {
            let config = load_config(address, config)?;

            // Ctrl+C cancels the current step; the orchestrator still disconnects.
            // A second Ctrl+C exits without waiting for cleanup.
            let interrupt = Arc::new(Interrupt::new());
            let handler_interrupt = interrupt.clone();
            ctrlc::set_handler(move || {
                if handler_interrupt.signal() {
                    eprintln!("\n{} Forced exit", "⏹️".yellow());
                    std::process::exit(1);
                }
            })?;

            let outcome = runner::run_connect(config, interrupt.notify()).await;
            let code = outcome.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
        }

        Commands::Devices => {
            println!("{} Listing android devices...", "🔍".to_string().blue());
            driver::list_devices().await?;
        }

        Commands::Disconnect { address, config } => {
            let config = load_config(address, config)?;
            driver::disconnect(&config.target).await?;
        }
    }

    Ok(())
}
