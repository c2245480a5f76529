use crate::driver::traits::ReachabilityProbe;
use crate::utils::binary_resolver;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;

/// Seconds to wait for the single echo reply
const PING_TIMEOUT_SECS: u32 = 2;

/// ping arguments for one echo request with a short timeout
pub fn ping_args(host: IpAddr) -> Vec<String> {
    let host = host.to_string();
    if cfg!(windows) {
        vec![
            "-n".to_string(),
            "1".to_string(),
            "-w".to_string(),
            (PING_TIMEOUT_SECS * 1000).to_string(),
            host,
        ]
    } else if cfg!(target_os = "macos") {
        // macOS -W is in milliseconds
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            (PING_TIMEOUT_SECS * 1000).to_string(),
            host,
        ]
    } else {
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            PING_TIMEOUT_SECS.to_string(),
            host,
        ]
    }
}

/// [`ReachabilityProbe`] using the system `ping`
#[derive(Debug, Default, Clone, Copy)]
pub struct PingProbe;

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn probe(&self, host: IpAddr) -> Result<bool> {
        let ping = binary_resolver::find_ping()?;
        let args = ping_args(host);
        log::debug!("{} {}", ping.display(), args.join(" "));

        let status = Command::new(ping)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to run ping for {}", host))?;

        Ok(status.success())
    }
}
