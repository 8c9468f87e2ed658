//! Scoped release of module handles

use tracing::{debug, warn};

use crate::model::Handle;
use crate::ports::ContextFlusher;

/// Owns a module handle and flushes it when dropped
///
/// Guards declared later in a scope drop first, so a pipeline that acquires
/// session, root key and object in that order releases them object first.
pub struct FlushGuard<'a, T: ContextFlusher + ?Sized> {
    tpm: &'a T,
    handle: Handle,
}

impl<'a, T: ContextFlusher + ?Sized> FlushGuard<'a, T> {
    pub fn new(tpm: &'a T, handle: Handle) -> Self {
        Self { tpm, handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl<T: ContextFlusher + ?Sized> Drop for FlushGuard<'_, T> {
    fn drop(&mut self) {
        match self.tpm.flush_context(self.handle) {
            Ok(()) => debug!("Released {}", self.handle),
            Err(e) => warn!("Failed to flush {}: {}", self.handle, e),
        }
    }
}
