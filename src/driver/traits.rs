use crate::parser::output::Device;
use crate::utils::config::{MirrorOptions, TargetAddress};
use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// Device bridge (adb) operations used while bringing up a wireless session
#[async_trait]
pub trait BridgeTool: Send + Sync {
    /// List bridge sessions (`adb devices`)
    async fn list_sessions(&self) -> Result<Vec<Device>>;

    /// Connect to a wireless endpoint. Returns the tool's raw text output;
    /// the caller classifies it.
    async fn connect(&self, target: &TargetAddress) -> Result<String>;

    /// Tear down a wireless session
    async fn disconnect(&self, target: &TargetAddress) -> Result<()>;

    /// Restart adbd on a wired device listening on a TCP port
    async fn switch_to_network(&self, serial: &str, port: u16) -> Result<()>;

    async fn kill_server(&self) -> Result<()>;

    async fn start_server(&self) -> Result<()>;
}

/// One-shot network reachability check
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `Ok(false)` when the host did not answer; `Err` when the probe itself
    /// could not run
    async fn probe(&self, host: IpAddr) -> Result<bool>;
}

/// How the mirroring tool exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorExit {
    /// `None` when terminated by a signal
    pub code: Option<i32>,
}

impl MirrorExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Screen mirroring tool (scrcpy)
#[async_trait]
pub trait MirrorTool: Send + Sync {
    /// Run the mirroring tool against `serial`, blocking until it exits
    async fn launch(&self, serial: &str, options: &MirrorOptions) -> Result<MirrorExit>;
}
