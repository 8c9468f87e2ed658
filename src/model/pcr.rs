//! PCR banks and selections

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use tss_esapi::interface_types::algorithm::HashingAlgorithm;
use tss_esapi::structures::{PcrSelectionList, PcrSlot};

/// Hash bank the selected PCRs are read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PcrBank {
    Sha1,
    #[default]
    Sha256,
}

impl PcrBank {
    /// Size in bytes of one PCR value in this bank
    pub fn digest_size(self) -> usize {
        match self {
            PcrBank::Sha1 => 20,
            PcrBank::Sha256 => 32,
        }
    }
}

impl From<PcrBank> for HashingAlgorithm {
    fn from(bank: PcrBank) -> Self {
        match bank {
            PcrBank::Sha1 => HashingAlgorithm::Sha1,
            PcrBank::Sha256 => HashingAlgorithm::Sha256,
        }
    }
}

impl fmt::Display for PcrBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcrBank::Sha1 => f.write_str("sha1"),
            PcrBank::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Parses bank names recorded at seal time
///
/// Unknown names are rejected instead of being read as sha256: a guessed
/// bank produces a policy digest that can never match.
impl FromStr for PcrBank {
    type Err = PcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(PcrBank::Sha1),
            "sha256" => Ok(PcrBank::Sha256),
            _ => Err(PcrError::UnsupportedBank {
                bank: s.to_string(),
            }),
        }
    }
}

/// Set of PCR indices bound into a policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcrSelection(BTreeSet<u8>);

impl PcrSelection {
    /// Highest PCR index a PC-client TPM exposes
    pub const MAX_INDEX: u8 = 23;

    /// Bytes in the selection bitmap (24 PCRs)
    pub const SELECT_SIZE: usize = 3;

    pub fn new<I>(indices: I) -> Result<Self, PcrError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut set = BTreeSet::new();
        for index in indices {
            if index > u32::from(Self::MAX_INDEX) {
                return Err(PcrError::IndexOutOfRange { index });
            }
            set.insert(index as u8);
        }
        Ok(Self(set))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, index: u8) -> bool {
        self.0.contains(&index)
    }

    /// Selected indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    pub fn bitmap(&self) -> [u8; Self::SELECT_SIZE] {
        let mut bitmap = [0u8; Self::SELECT_SIZE];
        for index in &self.0 {
            bitmap[(index / 8) as usize] |= 1 << (index % 8);
        }
        bitmap
    }

    /// Selection of these indices in `bank`, as ESAPI takes it
    pub fn to_selection_list(&self, bank: PcrBank) -> tss_esapi::Result<PcrSelectionList> {
        let slots = self
            .indices()
            .map(|index| PcrSlot::try_from(1u32 << index))
            .collect::<tss_esapi::Result<Vec<_>>>()?;
        PcrSelectionList::builder()
            .with_selection(bank.into(), &slots)
            .build()
    }
}

/// Errors that can occur when building a PCR selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PcrError {
    #[error("PCR bank {bank:?} is not supported, expected sha1 or sha256")]
    UnsupportedBank { bank: String },

    #[error("PCR index {index} is out of range (0..=23)")]
    IndexOutOfRange { index: u32 },
}
