//! KeyLoader trait - capability to create the root key and load children

use crate::error::UnsealResult;
use crate::model::{Handle, RootKeyTemplate, SealedBlob};

pub trait KeyLoader {
    /// Create a primary key under the owner hierarchy
    ///
    /// # Returns
    ///
    /// Handle of the transient primary key
    fn create_primary(&self, template: &RootKeyTemplate) -> UnsealResult<Handle>;

    /// Load a sealed object as a child of `parent`
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// - The private area does not verify under `parent`
    /// - The module has no free object slots
    fn load(&self, parent: Handle, blob: &SealedBlob) -> UnsealResult<Handle>;
}
