//! Ports (capabilities) for TPM operations
//!
//! These traits define the module commands the unseal pipeline needs. They
//! take `&self` so that scoped flush guards can hold a shared reference to
//! the device while the pipeline keeps issuing commands; adapters serialise
//! access to their channel internally.

mod context_flusher;
mod device_finder;
mod key_loader;
mod policy_sessions;
mod token_backend;
mod unsealer;

pub use context_flusher::ContextFlusher;
pub use device_finder::{DeviceFinder, TransportConfig};
pub use key_loader::KeyLoader;
pub use policy_sessions::PolicySessions;
pub use token_backend::TokenBackend;
pub use unsealer::Unsealer;

/// Combined trait for all module operations
///
/// A device handle typically implements this.
pub trait TpmOps: PolicySessions + KeyLoader + Unsealer + ContextFlusher {}

// Blanket implementation for types that implement all operation traits
impl<T> TpmOps for T where T: PolicySessions + KeyLoader + Unsealer + ContextFlusher {}
