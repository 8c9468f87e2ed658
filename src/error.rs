//! Error types for tpm-unseal
//!
//! This module defines the error hierarchy for all unseal operations.
//! The top-level kinds are deliberately coarse: a caller learns *that* a
//! policy, load or unseal step was refused, never which part of a password
//! or measurement check failed. Response codes only reach debug logs.

use thiserror::Error;

use crate::model::Handle;

/// Result type alias for unseal operations
///
/// This is a convenience alias for `Result<T, UnsealError>`.
pub type UnsealResult<T> = Result<T, UnsealError>;

/// Top-level error type for all unseal operations
#[derive(Error, Debug)]
pub enum UnsealError {
    /// Module could not be opened or a command failed below the policy level
    #[error("TPM transport error: {0}")]
    Transport(#[from] TransportError),

    /// Device answered, but not as a TPM 2.0
    #[error("device is not a TPM 2.0")]
    NotAModule,

    /// Recomputed policy digest differs from the one recorded at seal time
    #[error("current policy digest does not match stored policy digest, cancelling TPM2 authentication attempt")]
    PolicyMismatch,

    /// Module refused the password-required policy assertion
    #[error("TPM rejected the password policy assertion")]
    PasswordPolicyRejected,

    /// Sealed blob did not verify under the root key
    #[error("TPM refused to load the sealed object")]
    LoadRejected,

    /// Module refused to release the sealed payload
    #[error("unable to unseal data")]
    UnsealRejected,

    /// Policy requires a password but none was supplied
    #[error("policy requires a password but none was supplied")]
    DerivationInputInvalid,

    /// Input validation errors
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),
}

/// Failures reaching the module or running a command on it
#[derive(Error, Debug)]
pub enum TransportError {
    /// TCTI could not be loaded or the device did not answer
    #[error("failed to open TPM at {target}: {reason}")]
    OpenFailed { target: String, reason: String },

    /// Command was rejected by the module or by the ESAPI layer
    ///
    /// The displayed message names the command only; the response code is
    /// kept in `source` for debug logs.
    #[error("TPM2_{command} failed")]
    CommandFailed {
        command: &'static str,
        #[source]
        source: tss_esapi::Error,
    },

    /// Handle does not name a policy session this device started
    #[error("{0} is not an open policy session")]
    NotASession(Handle),
}

impl TransportError {
    pub(crate) fn command(command: &'static str) -> impl FnOnce(tss_esapi::Error) -> Self {
        move |source| TransportError::CommandFailed { command, source }
    }
}

/// Domain validation errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// Root key algorithm error
    #[error("Algorithm error: {0}")]
    Algorithm(#[from] crate::model::AlgorithmError),

    /// PCR bank or selection error
    #[error("PCR error: {0}")]
    Pcr(#[from] crate::model::PcrError),
}

impl From<crate::model::AlgorithmError> for UnsealError {
    fn from(err: crate::model::AlgorithmError) -> Self {
        UnsealError::Domain(DomainError::Algorithm(err))
    }
}

impl From<crate::model::PcrError> for UnsealError {
    fn from(err: crate::model::PcrError) -> Self {
        UnsealError::Domain(DomainError::Pcr(err))
    }
}
