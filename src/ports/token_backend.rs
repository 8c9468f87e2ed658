//! TokenBackend trait - open/query/close access to an authentication token

use std::path::Path;

use crate::error::UnsealResult;

/// Minimal access to a hidraw authentication token
///
/// Implemented over a native library by the caller; handles are not
/// reentrant, see `CapabilityProbe` for serialisation.
pub trait TokenBackend {
    type Handle;

    fn open(&self, path: &Path) -> UnsealResult<Self::Handle>;

    /// Whether the opened token implements the FIDO2 protocol
    fn is_fido2(&self, handle: &Self::Handle) -> bool;

    fn close(&self, handle: Self::Handle);
}
