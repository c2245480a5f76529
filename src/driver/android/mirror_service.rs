//! scrcpy mirroring
//!
//! Runs scrcpy in the foreground against the wireless serial. The process
//! inherits the terminal so scrcpy's own output stays visible, and the call
//! blocks until the mirroring window is closed.

use crate::driver::traits::{MirrorExit, MirrorTool};
use crate::utils::binary_resolver;
use crate::utils::config::MirrorOptions;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::process::Stdio;

/// Build the full scrcpy argument list for a serial
pub fn build_args(serial: &str, options: &MirrorOptions) -> Vec<String> {
    let mut args = vec!["-s".to_string(), serial.to_string()];
    args.extend(options.to_args());
    args
}

/// Launches scrcpy
#[derive(Debug, Default, Clone, Copy)]
pub struct ScrcpyMirror;

impl ScrcpyMirror {
    /// Run scrcpy and wait for it to exit
    pub async fn run(serial: &str, options: &MirrorOptions) -> Result<MirrorExit> {
        let scrcpy = binary_resolver::find_scrcpy()?;
        let args = build_args(serial, options);
        log::debug!("{} {}", scrcpy.display(), args.join(" "));

        let mut child = tokio::process::Command::new(&scrcpy)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("Failed to start scrcpy: {}", e))?;

        let status = child
            .wait()
            .await
            .map_err(|e| anyhow!("Failed to wait for scrcpy: {}", e))?;

        Ok(MirrorExit {
            code: status.code(),
        })
    }
}

#[async_trait]
impl MirrorTool for ScrcpyMirror {
    async fn launch(&self, serial: &str, options: &MirrorOptions) -> Result<MirrorExit> {
        Self::run(serial, options).await
    }
}
