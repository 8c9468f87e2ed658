//! Use cases (orchestration)
//!
//! This module contains use cases that orchestrate operations across multiple ports.
//! Each step of the unseal pipeline lives in its own module; `unseal` composes
//! them so every acquired handle is released on the way out.

mod flush_guard;
mod load_sealed;
mod policy_session;
mod provision_root_key;
mod pipeline;

use tracing::debug;

use crate::error::{TransportError, UnsealError};

pub use flush_guard::FlushGuard;
pub use load_sealed::load_sealed;
pub use policy_session::build_policy_session;
pub use provision_root_key::provision_root_key;
pub use pipeline::{invoke_unseal, unseal, unseal_with_device, UnsealRequest};

/// Replace a refused command with `kind`, keeping open and handle failures
/// as they are
///
/// The ESAPI error, and with it any response code, is only logged.
fn refused_as(err: UnsealError, kind: UnsealError) -> UnsealError {
    match err {
        UnsealError::Transport(TransportError::CommandFailed { command, source }) => {
            debug!(?source, "TPM2_{} refused", command);
            kind
        }
        other => other,
    }
}
