use std::path::PathBuf;
use std::time::Duration;

use super::TpmOps;
use crate::error::UnsealResult;

/// Where and how to reach the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Talk to a software TPM over TCP instead of the device node
    pub emulated: bool,
    /// Resource-managed TPM character device
    pub device_path: PathBuf,
    /// Host the software TPM listens on
    pub emulator_host: String,
    /// Command port of the software TPM; the control port is the next one
    pub emulator_port: u16,
    /// How long to wait for the device to appear before trying anyway
    pub ready_timeout: Duration,
}

impl TransportConfig {
    pub const DEFAULT_DEVICE_PATH: &'static str = "/dev/tpmrm0";
    pub const DEFAULT_EMULATOR_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_EMULATOR_PORT: u16 = 2321;
    pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn emulator() -> Self {
        Self {
            emulated: true,
            ..Self::default()
        }
    }

    /// TCTI configuration string, e.g. `device:/dev/tpmrm0`
    pub fn tcti_name(&self) -> String {
        if self.emulated {
            format!("swtpm:host={},port={}", self.emulator_host, self.emulator_port)
        } else {
            format!("device:{}", self.device_path.display())
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            emulated: false,
            device_path: PathBuf::from(Self::DEFAULT_DEVICE_PATH),
            emulator_host: Self::DEFAULT_EMULATOR_HOST.to_string(),
            emulator_port: Self::DEFAULT_EMULATOR_PORT,
            ready_timeout: Self::DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Capability to open the module
pub trait DeviceFinder {
    type Device: TpmOps;

    /// Open the configured module and verify it speaks TPM 2.0
    ///
    /// # Errors
    ///
    /// Returns `UnsealError::Transport` if the module cannot be opened and
    /// `UnsealError::NotAModule` if the device does not identify as TPM 2.0
    fn find_first(&self) -> UnsealResult<Self::Device>;
}
