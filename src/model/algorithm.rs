//! Root key algorithm selection

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Asymmetric algorithm of the storage root key
///
/// The sealed blob can only be loaded under a root key created from the same
/// template it was sealed against, so this must match the sealing side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSA 2048-bit storage key
    #[default]
    Rsa,
    /// ECC NIST P-256 storage key
    Ecc,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Rsa => "rsa",
            Algorithm::Ecc => "ecc",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => Ok(Algorithm::Rsa),
            "ecc" => Ok(Algorithm::Ecc),
            _ => Err(AlgorithmError::Unsupported {
                algorithm: s.to_string(),
            }),
        }
    }
}

impl TryFrom<&str> for Algorithm {
    type Error = AlgorithmError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Errors that can occur when selecting an algorithm
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Algorithm is neither rsa nor ecc
    #[error("failed getting srk template because encryption algorithm {algorithm:?} is not ecc/rsa")]
    Unsupported { algorithm: String },
}
