use crate::driver::traits::BridgeTool;
use crate::parser::output::{self, Device};
use crate::utils::binary_resolver;
use crate::utils::config::TargetAddress;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;

async fn run_adb(args: &[&str]) -> Result<Output> {
    let adb_path = binary_resolver::find_adb()?;
    log::debug!("adb {}", args.join(" "));

    Command::new(adb_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to execute: adb {}", args.join(" ")))
}

/// Get list of bridge sessions
pub async fn get_devices() -> Result<Vec<Device>> {
    let output = run_adb(&["devices"]).await?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        log::debug!("adb devices stderr:\n{}", stderr);
    }
    if !output.status.success() {
        anyhow::bail!("adb devices failed: {}", stderr.trim());
    }

    Ok(output::parse_devices(&String::from_utf8_lossy(&output.stdout)))
}

/// Execute a raw ADB command, failing on non-zero exit
pub async fn exec(serial: Option<&str>, args: &[&str]) -> Result<String> {
    let mut full_args = Vec::new();

    if let Some(s) = serial {
        full_args.push("-s");
        full_args.push(s);
    }

    full_args.extend_from_slice(args);

    let output = run_adb(&full_args).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ADB command failed: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// `adb connect <addr>`.
///
/// adb reports connect failures on stdout and, depending on the version,
/// with exit status 0, so stdout and stderr are returned together for
/// classification instead of relying on the status.
pub async fn connect(target: &TargetAddress) -> Result<String> {
    let serial = target.serial();
    let output = run_adb(&["connect", serial.as_str()]).await?;

    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        text.push_str(&stderr);
    }
    log::debug!("adb connect {}: {}", serial, text.trim());

    Ok(text)
}

/// `adb disconnect <addr>`
pub async fn disconnect(target: &TargetAddress) -> Result<()> {
    let serial = target.serial();
    let output = exec(None, &["disconnect", serial.as_str()]).await?;
    log::debug!("adb disconnect {}: {}", serial, output.trim());
    Ok(())
}

/// `adb -s <serial> tcpip <port>`
pub async fn tcpip(serial: &str, port: u16) -> Result<()> {
    let port = port.to_string();
    let output = exec(Some(serial), &["tcpip", port.as_str()]).await?;
    log::debug!("adb -s {} tcpip {}: {}", serial, port, output.trim());
    Ok(())
}

pub async fn kill_server() -> Result<()> {
    exec(None, &["kill-server"]).await.map(|_| ())
}

pub async fn start_server() -> Result<()> {
    exec(None, &["start-server"]).await.map(|_| ())
}

/// [`BridgeTool`] backed by the adb CLI
#[derive(Debug, Default, Clone, Copy)]
pub struct AdbBridge;

#[async_trait]
impl BridgeTool for AdbBridge {
    async fn list_sessions(&self) -> Result<Vec<Device>> {
        get_devices().await
    }

    async fn connect(&self, target: &TargetAddress) -> Result<String> {
        connect(target).await
    }

    async fn disconnect(&self, target: &TargetAddress) -> Result<()> {
        disconnect(target).await
    }

    async fn switch_to_network(&self, serial: &str, port: u16) -> Result<()> {
        tcpip(serial, port).await
    }

    async fn kill_server(&self) -> Result<()> {
        kill_server().await
    }

    async fn start_server(&self) -> Result<()> {
        start_server().await
    }
}
