use thiserror::Error;

/// Failures that end a connect run.
///
/// Every variant carries enough detail for a human-readable diagnostic and
/// exposes remediation hints through [`ConnectError::remediation`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Device at {address} is not reachable over the network")]
    NetworkUnreachable { address: String },

    #[error("Could not connect to {address}: {output}")]
    BridgeConnectFailure { address: String, output: String },

    #[error("Device {address} is offline")]
    StateOffline { address: String },

    #[error("Device {address} is unauthorized")]
    StateUnauthorized { address: String },

    #[error("Device {address} is not ready (state: {state})")]
    StateUnknown { address: String, state: String },

    #[error("Screen mirroring failed: {detail}")]
    MirroringLaunchFailure { detail: String },

    #[error("Interrupted before mirroring started")]
    Interrupted,
}

impl ConnectError {
    /// Suggestions printed below the diagnostic.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            ConnectError::NetworkUnreachable { .. } => &[
                "Make sure the phone and this computer are on the same network",
                "Check that Wireless debugging is enabled in Developer options",
                "Verify the IP address shown under Wireless debugging",
            ],
            ConnectError::BridgeConnectFailure { .. } => &[
                "Re-enable Wireless debugging on the device",
                "Connect the USB cable once so adb can switch the device to tcpip mode",
            ],
            ConnectError::StateOffline { .. } => &[
                "Toggle Wireless debugging off and on",
                "Reboot the device if it stays offline",
            ],
            ConnectError::StateUnauthorized { .. } => {
                &["Check the device screen and accept the USB debugging prompt"]
            }
            ConnectError::StateUnknown { .. } => &["Run `adb devices` to inspect the device state"],
            ConnectError::MirroringLaunchFailure { .. } => &[
                "Make sure scrcpy is installed and available on PATH",
                "Run scrcpy manually to see its full output",
            ],
            ConnectError::Interrupted => &[],
        }
    }
}
