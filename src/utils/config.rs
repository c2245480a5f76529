use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Wireless debug endpoint used when nothing else is configured
pub const DEFAULT_HOST: [u8; 4] = [192, 168, 1, 100];
pub const DEFAULT_PORT: u16 = 5555;

/// Pause after a mode switch so adbd on the device can restart
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3000;

/// Config file looked up under the install directory when `--config` is absent
pub const CONFIG_FILE_NAME: &str = "mirror.yaml";

/// IP address + port of the device's wireless debug endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetAddress {
    pub host: IpAddr,
    pub port: u16,
}

impl TargetAddress {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    /// Serial adb uses for the wireless session (`ip:port`)
    pub fn serial(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host {
            IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port),
            IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port),
        }
    }
}

impl FromStr for TargetAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let addr: std::net::SocketAddr = s
            .trim()
            .parse()
            .with_context(|| format!("Invalid target address '{}', expected ip:port", s))?;
        if addr.port() == 0 {
            anyhow::bail!("Invalid target address '{}': port must not be 0", s);
        }
        Ok(Self::new(addr.ip(), addr.port()))
    }
}

impl TryFrom<String> for TargetAddress {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TargetAddress> for String {
    fn from(value: TargetAddress) -> Self {
        value.to_string()
    }
}

/// scrcpy video codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    Av1,
}

impl VideoCodec {
    pub fn as_arg(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Av1 => "av1",
        }
    }
}

/// scrcpy keyboard input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardMode {
    #[default]
    Disabled,
    Sdk,
    Uhid,
    Aoa,
}

impl KeyboardMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            KeyboardMode::Disabled => "disabled",
            KeyboardMode::Sdk => "sdk",
            KeyboardMode::Uhid => "uhid",
            KeyboardMode::Aoa => "aoa",
        }
    }
}

/// Options handed to scrcpy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorOptions {
    /// Turn the device display off while streaming
    pub turn_screen_off: bool,

    /// Video bitrate, scrcpy syntax (e.g. "8M")
    pub video_bit_rate: String,

    pub video_codec: VideoCodec,

    /// Max width/height in pixels (0 = unlimited)
    pub max_size: u32,

    /// Max frame rate (0 = unlimited)
    pub max_fps: u32,

    pub disable_screensaver: bool,

    pub keyboard: KeyboardMode,

    /// Passed through verbatim after the generated flags
    pub extra_args: Vec<String>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            turn_screen_off: true,
            video_bit_rate: "8M".to_string(),
            video_codec: VideoCodec::H264,
            max_size: 1920,
            max_fps: 60,
            disable_screensaver: true,
            keyboard: KeyboardMode::Disabled,
            extra_args: Vec::new(),
        }
    }
}

impl MirrorOptions {
    /// Build scrcpy command-line flags (without the serial)
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.turn_screen_off {
            args.push("--turn-screen-off".to_string());
        }
        if !self.video_bit_rate.is_empty() {
            args.push(format!("--video-bit-rate={}", self.video_bit_rate));
        }
        args.push(format!("--video-codec={}", self.video_codec.as_arg()));
        if self.max_size > 0 {
            args.push(format!("--max-size={}", self.max_size));
        }
        if self.max_fps > 0 {
            args.push(format!("--max-fps={}", self.max_fps));
        }
        if self.disable_screensaver {
            args.push("--disable-screensaver".to_string());
        }
        args.push(format!("--keyboard={}", self.keyboard.as_arg()));
        args.extend(self.extra_args.iter().cloned());

        args
    }
}

/// Immutable configuration for one connect run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectConfig {
    /// Wireless debug endpoint; its port is also the port passed to `adb tcpip`
    pub target: TargetAddress,

    /// Settle delay after mode switches (ms)
    #[serde(alias = "settleDelay")]
    pub settle_delay_ms: u64,

    pub mirror: MirrorOptions,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            mirror: MirrorOptions::default(),
        }
    }
}

fn default_target() -> TargetAddress {
    TargetAddress::new(IpAddr::from(DEFAULT_HOST), DEFAULT_PORT)
}

impl ConnectConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Parse a YAML document; missing fields keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse config YAML")
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `~/.lumi-tester/mirror.yaml`
    /// is used when present, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        match path {
            Some(p) => {
                log::debug!("Loading config from {}", p.display());
                let content = std::fs::read_to_string(&p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Invalid config file {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Copy with the target replaced
    pub fn with_target(mut self, target: TargetAddress) -> Self {
        self.target = target;
        self
    }
}

/// `~/.lumi-tester/mirror.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lumi-tester").join(CONFIG_FILE_NAME))
}
