//! Key provisioner: re-create the storage root key from its template

use tracing::debug;

use super::FlushGuard;
use crate::error::UnsealResult;
use crate::model::{Algorithm, RootKeyTemplate};
use crate::ports::{ContextFlusher, KeyLoader};

/// Create the `algorithm` storage root key under the owner hierarchy
///
/// The key is never persisted. The same template under the same owner seed
/// yields the same key, which is what the sealed blob was wrapped under.
pub fn provision_root_key<T>(tpm: &T, algorithm: Algorithm) -> UnsealResult<FlushGuard<'_, T>>
where
    T: KeyLoader + ContextFlusher + ?Sized,
{
    let template = RootKeyTemplate::for_algorithm(algorithm);
    debug!("Provisioning {} storage root key", algorithm);
    let handle = tpm.create_primary(&template)?;
    Ok(FlushGuard::new(tpm, handle))
}
