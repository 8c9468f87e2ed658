//! Unseal invoker and the end-to-end unseal pipeline

use tracing::{debug, info};

use super::{build_policy_session, load_sealed, provision_root_key, refused_as, FlushGuard};
use crate::error::{UnsealError, UnsealResult};
use crate::logic::{derive_for_policy, AuthValue};
use crate::model::{Algorithm, AuthSecret, PolicySpec, SealedBlob, UnsealedSecret};
use crate::ports::{ContextFlusher, DeviceFinder, TpmOps, Unsealer};

/// Everything recorded at seal time, plus the operator's password
#[derive(Debug, Clone)]
pub struct UnsealRequest {
    pub blob: SealedBlob,
    pub policy: PolicySpec,
    /// Algorithm of the root key the blob was sealed under
    pub algorithm: Algorithm,
    pub secret: Option<AuthSecret>,
}

impl UnsealRequest {
    pub fn new(blob: SealedBlob, policy: PolicySpec, algorithm: Algorithm) -> Self {
        Self {
            blob,
            policy,
            algorithm,
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: AuthSecret) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// Release the payload of `object` through `session`
///
/// With no `auth` an empty authorization is set, which the module accepts
/// for policies without a password assertion. Both handles are borrowed from
/// their guards, so neither can be used after it was flushed.
///
/// # Errors
///
/// Returns `UnsealError::UnsealRejected` if the module refuses, which
/// includes a wrong password behind a matching policy digest.
pub fn invoke_unseal<T>(
    tpm: &T,
    session: &FlushGuard<'_, T>,
    object: &FlushGuard<'_, T>,
    auth: Option<&AuthValue>,
) -> UnsealResult<UnsealedSecret>
where
    T: Unsealer + ContextFlusher + ?Sized,
{
    let encoded = auth.map(AuthValue::encoded);
    let auth_bytes = encoded.as_ref().map(|e| e.as_slice()).unwrap_or_default();
    tpm.unseal(session.handle(), object.handle(), auth_bytes)
        .map_err(|e| refused_as(e, UnsealError::UnsealRejected))
}

/// Run the unseal pipeline against an open device
///
/// Session, root key and sealed object are flushed before this returns,
/// whatever the outcome.
pub fn unseal_with_device<T>(tpm: &T, request: &UnsealRequest) -> UnsealResult<UnsealedSecret>
where
    T: TpmOps + ?Sized,
{
    let policy = &request.policy;
    if policy.requires_password && request.secret.is_none() {
        return Err(UnsealError::DerivationInputInvalid);
    }

    let (session, _digest) = build_policy_session(tpm, policy, policy.requires_password)?;
    debug!("Policy digest verified");

    let root_key = provision_root_key(tpm, request.algorithm)?;
    let object = load_sealed(tpm, &root_key, &request.blob)?;

    let auth = derive_for_policy(policy, request.secret.as_ref())?;
    let secret = invoke_unseal(tpm, &session, &object, auth.as_ref())?;
    info!("Unsealed {} byte secret", secret.len());
    Ok(secret)
}

/// Find the module and unseal `request` with it
pub fn unseal<F>(finder: &F, request: &UnsealRequest) -> UnsealResult<UnsealedSecret>
where
    F: DeviceFinder,
{
    let device = finder.find_first()?;
    unseal_with_device(&device, request)
}
