use std::fmt;

/// Public and private areas produced by a prior sealing operation
///
/// Both are the raw `TPMT_PUBLIC` / `TPM2B_PRIVATE` contents without their
/// outer size prefix, as the sealing tool wrote them.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBlob {
    pub public: Vec<u8>,
    pub private: Vec<u8>,
}

impl SealedBlob {
    pub fn new(public: Vec<u8>, private: Vec<u8>) -> Self {
        Self { public, private }
    }
}

impl fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedBlob")
            .field("public_len", &self.public.len())
            .field("private_len", &self.private.len())
            .finish()
    }
}
