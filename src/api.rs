use crate::adapters::Tpm2DeviceFinder;
use crate::error::UnsealResult;
use crate::ports::TransportConfig;
use crate::readiness::ReadinessGate;
use crate::use_cases::unseal as unseal_use_case;

pub use crate::model::*;
pub use crate::use_cases::UnsealRequest;

/// Unseal from the system TPM at `/dev/tpmrm0`
///
/// Waits up to three seconds for `gate` before opening the device.
pub fn unseal(gate: &ReadinessGate, request: &UnsealRequest) -> UnsealResult<UnsealedSecret> {
    unseal_use_case(&system_finder(gate), request)
}

pub fn unseal_with_config(
    config: TransportConfig,
    gate: &ReadinessGate,
    request: &UnsealRequest,
) -> UnsealResult<UnsealedSecret> {
    let finder = Tpm2DeviceFinder::new(config, gate.clone());
    unseal_use_case(&finder, request)
}

fn system_finder(gate: &ReadinessGate) -> Tpm2DeviceFinder {
    Tpm2DeviceFinder::new(TransportConfig::default(), gate.clone())
}
