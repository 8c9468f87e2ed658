//! Password-based authorization value derivation
//!
//! PBKDF2-HMAC-SHA256 with 10000 iterations and a 32-byte output, presented
//! to the module as padded standard base64 text. These parameters are the
//! ones systemd-cryptenroll uses for TPM2+PIN enrollment; changing any of
//! them makes blobs sealed there impossible to unseal here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{UnsealError, UnsealResult};
use crate::model::{AuthSecret, PolicySpec};

pub const PBKDF2_HMAC_SHA256_ITERATIONS: u32 = 10_000;

pub const AUTH_VALUE_LENGTH: usize = 32;

/// Derived authorization value for a password-gated object
#[derive(Clone, PartialEq, Eq)]
pub struct AuthValue(Zeroizing<[u8; AUTH_VALUE_LENGTH]>);

impl AuthValue {
    pub fn as_bytes(&self) -> &[u8; AUTH_VALUE_LENGTH] {
        &self.0
    }

    /// Encoding the module compares against the sealed object's authValue
    pub fn encoded(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(STANDARD.encode(self.0.as_slice()).into_bytes())
    }
}

impl fmt::Debug for AuthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthValue([REDACTED])")
    }
}

pub fn derive_auth(secret: &AuthSecret) -> AuthValue {
    let mut output = Zeroizing::new([0u8; AUTH_VALUE_LENGTH]);
    pbkdf2_hmac::<Sha256>(
        secret.password.as_bytes(),
        &secret.salt,
        PBKDF2_HMAC_SHA256_ITERATIONS,
        output.as_mut_slice(),
    );
    AuthValue(output)
}

/// Derive the authorization value a policy calls for
///
/// Returns `None` for measurement-only policies, in which case any supplied
/// secret is ignored.
pub fn derive_for_policy(
    policy: &PolicySpec,
    secret: Option<&AuthSecret>,
) -> UnsealResult<Option<AuthValue>> {
    match (policy.requires_password, secret) {
        (true, Some(secret)) => {
            debug!("Deriving authorization value ({} byte salt)", secret.salt.len());
            Ok(Some(derive_auth(secret)))
        }
        (true, None) => Err(UnsealError::DerivationInputInvalid),
        (false, Some(_)) => {
            debug!("Policy has no password assertion, ignoring supplied password");
            Ok(None)
        }
        (false, None) => Ok(None),
    }
}
