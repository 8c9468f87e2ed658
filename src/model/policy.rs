//! Authorization policy recorded at seal time

use crate::model::{PcrBank, PcrSelection};

/// Policy a sealed object was bound to
///
/// `expected_digest` is the commitment; the other fields only describe how
/// to replay the policy in a fresh session so the module can recompute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySpec {
    /// PCRs asserted with `TPM2_PolicyPCR`; empty skips the assertion
    pub pcr_selection: PcrSelection,
    /// Bank the selected PCRs are read from
    pub pcr_bank: PcrBank,
    /// Policy digest stored alongside the sealed blob
    pub expected_digest: Vec<u8>,
    /// Whether `TPM2_PolicyPassword` was part of the policy
    pub requires_password: bool,
}

impl PolicySpec {
    pub fn new(
        pcr_selection: PcrSelection,
        pcr_bank: PcrBank,
        expected_digest: Vec<u8>,
        requires_password: bool,
    ) -> Self {
        Self {
            pcr_selection,
            pcr_bank,
            expected_digest,
            requires_password,
        }
    }

    /// Policy with only a password assertion
    pub fn password_only(expected_digest: Vec<u8>) -> Self {
        Self::new(PcrSelection::empty(), PcrBank::default(), expected_digest, true)
    }

    pub fn binds_pcrs(&self) -> bool {
        !self.pcr_selection.is_empty()
    }
}
