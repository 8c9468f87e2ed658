use std::fmt;
use std::ops::Deref;
use zeroize::Zeroizing;

/// Payload released by a successful unseal
///
/// Zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct UnsealedSecret(Zeroizing<Vec<u8>>);

impl UnsealedSecret {
    pub fn new(data: Vec<u8>) -> Self {
        Self(Zeroizing::new(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for UnsealedSecret {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for UnsealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnsealedSecret([REDACTED; {}])", self.0.len())
    }
}
