//! PolicySessions trait - capability to build policy sessions

use crate::error::UnsealResult;
use crate::model::{Handle, PcrBank, PcrSelection};

/// Capability to start a policy session and assert predicates into it
///
/// The session digest is a hash chain over assertions in the order they are
/// made, so callers must assert in the same order the policy was built.
pub trait PolicySessions {
    /// Start an unbound, unsalted policy session hashing with SHA-256
    fn start_policy_session(&self) -> UnsealResult<Handle>;

    /// Bind the session to the current values of `selection` in `bank`
    ///
    /// Succeeds even when the PCR values differ from seal time; the
    /// difference only shows up in the resulting digest.
    fn policy_pcr(&self, session: Handle, selection: &PcrSelection, bank: PcrBank)
        -> UnsealResult<()>;

    /// Require the object's authValue to be presented in clear
    fn policy_password(&self, session: Handle) -> UnsealResult<()>;

    /// Read the accumulated policy digest
    fn policy_get_digest(&self, session: Handle) -> UnsealResult<Vec<u8>>;
}
