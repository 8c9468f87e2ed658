//! Object loader

use super::{refused_as, FlushGuard};
use crate::error::{UnsealError, UnsealResult};
use crate::model::SealedBlob;
use crate::ports::{ContextFlusher, KeyLoader};

/// Load `blob` under `root_key`
///
/// # Errors
///
/// Returns `UnsealError::LoadRejected` if the module refuses the blob. A
/// corrupted blob, one sealed under another root key template and one
/// sealed on another module all look the same here.
pub fn load_sealed<'a, T>(
    tpm: &'a T,
    root_key: &FlushGuard<'_, T>,
    blob: &SealedBlob,
) -> UnsealResult<FlushGuard<'a, T>>
where
    T: KeyLoader + ContextFlusher + ?Sized,
{
    let handle = tpm
        .load(root_key.handle(), blob)
        .map_err(|e| refused_as(e, UnsealError::LoadRejected))?;
    Ok(FlushGuard::new(tpm, handle))
}
