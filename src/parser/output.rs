//! Parsing of adb text output
//!
//! adb has no structured output for `devices` or `connect`, so everything the
//! orchestrator decides on is read here from plain text.

use std::fmt;
use std::net::SocketAddr;

/// One row of `adb devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

impl Device {
    pub fn session_state(&self) -> SessionState {
        SessionState::from_listing(&self.state)
    }
}

/// State of a bridge session as reported by `adb devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// `device`: ready for commands
    Device,
    Offline,
    Unauthorized,
    /// Any other state column (`recovery`, `sideload`, `authorizing`, ...)
    Unrecognized(String),
    /// No row for the serial
    Absent,
}

impl SessionState {
    pub fn from_listing(state: &str) -> Self {
        match state.trim() {
            "device" => SessionState::Device,
            "offline" => SessionState::Offline,
            "unauthorized" => SessionState::Unauthorized,
            "" => SessionState::Absent,
            other => SessionState::Unrecognized(other.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Device)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Device => write!(f, "device"),
            SessionState::Offline => write!(f, "offline"),
            SessionState::Unauthorized => write!(f, "unauthorized"),
            SessionState::Unrecognized(s) => write!(f, "{}", s),
            SessionState::Absent => write!(f, "absent"),
        }
    }
}

/// Result of `adb connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    AlreadyConnected,
    Failed(String),
}

/// Parse the output of `adb devices`.
///
/// Skips the `List of devices attached` header, `* daemon ... *` banners
/// printed when the server starts, and blank lines.
pub fn parse_devices(output: &str) -> Vec<Device> {
    let mut devices = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('*') || line.starts_with("List of devices") {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            devices.push(Device {
                serial: parts[0].to_string(),
                state: parts[1].to_string(),
            });
        }
    }

    devices
}

/// State of `serial` within a device listing
pub fn session_state_of(devices: &[Device], serial: &str) -> SessionState {
    devices
        .iter()
        .find(|d| d.serial == serial)
        .map(Device::session_state)
        .unwrap_or(SessionState::Absent)
}

/// Whether a serial names a network transport rather than a USB device:
/// `ip:port` sessions and mDNS serials such as
/// `adb-R58M12ABCDE-a1b2c3._adb-tls-connect._tcp`
pub fn is_network_serial(serial: &str) -> bool {
    serial.parse::<SocketAddr>().is_ok()
        || serial.contains("._adb-tls-connect.")
        || serial.contains("._adb._tcp")
}

/// Wired sessions eligible for a switch to tcpip mode: USB sessions whose
/// state is exactly `device`. Every network session is excluded, including
/// the target itself and stale sessions to the same host on other ports.
pub fn wired_candidates(devices: &[Device]) -> Vec<&Device> {
    devices
        .iter()
        .filter(|d| !is_network_serial(&d.serial))
        .filter(|d| d.session_state().is_ready())
        .collect()
}

/// Classify `adb connect` output.
///
/// "already connected" is checked first since it also contains "connected".
pub fn classify_connect(output: &str) -> ConnectOutcome {
    let lower = output.to_lowercase();
    if lower.contains("already connected") {
        ConnectOutcome::AlreadyConnected
    } else if lower.contains("connected") {
        ConnectOutcome::Connected
    } else {
        ConnectOutcome::Failed(output.trim().to_string())
    }
}
