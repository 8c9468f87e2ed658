//! Policy session builder

use tracing::debug;

use super::{refused_as, FlushGuard};
use crate::error::{UnsealError, UnsealResult};
use crate::model::PolicySpec;
use crate::ports::{ContextFlusher, PolicySessions};

/// Replay `policy` in a fresh session and check the module reaches the
/// recorded digest
///
/// The PCR assertion, when the selection is non-empty, always precedes the
/// password assertion. An empty selection asserts nothing, so a
/// password-only policy digest is `H(0^32 || TPM_CC_PolicyAuthValue)`.
///
/// # Returns
///
/// The session, owned by a guard, and the verified digest
///
/// # Errors
///
/// - `UnsealError::Transport` if the session cannot be started
/// - `UnsealError::PasswordPolicyRejected` if the password assertion is refused
/// - `UnsealError::PolicyMismatch` if the digest differs from
///   `policy.expected_digest`
///
/// The session is flushed on every error path.
pub fn build_policy_session<'a, T>(
    tpm: &'a T,
    policy: &PolicySpec,
    have_password: bool,
) -> UnsealResult<(FlushGuard<'a, T>, Vec<u8>)>
where
    T: PolicySessions + ContextFlusher + ?Sized,
{
    let session = FlushGuard::new(tpm, tpm.start_policy_session()?);

    if policy.binds_pcrs() {
        debug!(
            "Asserting {} PCR(s) from the {} bank",
            policy.pcr_selection.len(),
            policy.pcr_bank
        );
        tpm.policy_pcr(session.handle(), &policy.pcr_selection, policy.pcr_bank)?;
    }

    if have_password {
        tpm.policy_password(session.handle())
            .map_err(|e| refused_as(e, UnsealError::PasswordPolicyRejected))?;
    }

    let digest = tpm.policy_get_digest(session.handle())?;
    if digest != policy.expected_digest {
        debug!("Policy digest mismatch");
        return Err(UnsealError::PolicyMismatch);
    }

    Ok((session, digest))
}
