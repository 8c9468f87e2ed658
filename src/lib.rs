//! Unseal secrets that a TPM 2.0 sealed behind a policy
//!
//! A sealed blob is released only when the module recomputes the policy
//! digest recorded at seal time: the selected PCRs must hold the values
//! they held then, and a password-gated policy additionally needs the
//! authorization value derived from the operator's password.
//!
//! The pipeline lives in [`use_cases`]; [`api`] wires it to the system
//! device. Every module handle is released before a call returns.

pub mod adapters;
pub mod api;
pub mod error;
mod logic;
pub mod model;
pub mod ports;
pub mod probe;
pub mod readiness;
pub mod use_cases;

// Re-export commonly used types
pub use error::{TransportError, UnsealError, UnsealResult};
pub use logic::{derive_auth, AuthValue, AUTH_VALUE_LENGTH, PBKDF2_HMAC_SHA256_ITERATIONS};
pub use probe::CapabilityProbe;
pub use readiness::ReadinessGate;

// Re-export public API
pub use api::{unseal, unseal_with_config};
