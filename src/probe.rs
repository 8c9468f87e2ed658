//! Device-capability probe for authentication tokens
//!
//! Token handles are not reentrant, so concurrent probes of the same path
//! queue behind a per-path lock. Different paths proceed in parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::UnsealResult;
use crate::ports::TokenBackend;

pub struct CapabilityProbe<B> {
    backend: B,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl<B: TokenBackend> CapabilityProbe<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open the token at `path`, ask whether it speaks FIDO2, close it
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the token cannot be opened.
    pub fn is_capable_device(&self, path: &Path) -> UnsealResult<bool> {
        let lock = self.path_lock(path);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let handle = self.backend.open(path)?;
        let capable = self.backend.is_fido2(&handle);
        self.backend.close(handle);

        debug!("{} fido2 capable: {}", path.display(), capable);
        Ok(capable)
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}
