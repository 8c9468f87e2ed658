//! Adapters - concrete implementations of ports (traits)

mod tpm2_device;

#[cfg(test)]
pub mod fake_tpm;

// Re-export for convenience
pub use tpm2_device::{Tpm2Device, Tpm2DeviceFinder, TpmIdentity, TPM2_FAMILY};
