pub mod adb;
pub mod mirror_service;

pub use adb::AdbBridge;
pub use mirror_service::ScrcpyMirror;

use crate::utils::config::TargetAddress;
use anyhow::Result;
use colored::Colorize;

/// List adb sessions, wired and wireless
pub async fn list_devices() -> Result<()> {
    let devices = adb::get_devices().await?;

    if devices.is_empty() {
        println!("  No Android devices connected");
    } else {
        println!("  Found {} device(s):", devices.len());
        for device in devices {
            let kind = if device.serial.parse::<TargetAddress>().is_ok() {
                "wifi"
            } else {
                "usb"
            };
            println!(
                "    {} {} ({}, {})",
                "•".green(),
                device.serial.white().bold(),
                device.state.dimmed(),
                kind.dimmed()
            );
        }
    }

    Ok(())
}

/// Disconnect a wireless session
pub async fn disconnect(target: &TargetAddress) -> Result<()> {
    adb::disconnect(target).await?;
    println!("  {} Disconnected {}", "✓".green(), target);
    Ok(())
}
