use crate::error::UnsealResult;
use crate::model::{Handle, UnsealedSecret};

/// Capability to release the payload of a loaded sealed object
pub trait Unsealer {
    /// Unseal `object`, authorizing through the policy `session`
    ///
    /// `auth` travels in the session's HMAC field; it is only checked by the
    /// module when the policy contained a password assertion.
    fn unseal(&self, session: Handle, object: Handle, auth: &[u8]) -> UnsealResult<UnsealedSecret>;
}
