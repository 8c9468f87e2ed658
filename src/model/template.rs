//! Primary storage key template
//!
//! The root key is never stored. It is re-derived on every attempt from the
//! owner seed and this template, so every field here must match what the
//! sealing side used or the sealed blob will not load.

use tss_esapi::attributes::{ObjectAttributes, ObjectAttributesBuilder};
use tss_esapi::interface_types::algorithm::{HashingAlgorithm, PublicAlgorithm};
use tss_esapi::interface_types::ecc::EccCurve;
use tss_esapi::interface_types::key_bits::RsaKeyBits;
use tss_esapi::structures::{
    EccPoint, Public, PublicBuilder, PublicEccParametersBuilder, PublicKeyRsa,
    PublicRsaParametersBuilder, RsaExponent, SymmetricDefinitionObject,
};

use crate::model::Algorithm;

/// Template of the storage root key for one algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootKeyTemplate {
    pub algorithm: Algorithm,
}

impl RootKeyTemplate {
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    /// Restricted decryption key, not bound to dictionary-attack lockout
    pub fn object_attributes(&self) -> tss_esapi::Result<ObjectAttributes> {
        ObjectAttributesBuilder::new()
            .with_fixed_tpm(true)
            .with_fixed_parent(true)
            .with_st_clear(false)
            .with_sensitive_data_origin(true)
            .with_user_with_auth(true)
            .with_no_da(true)
            .with_restricted(true)
            .with_decrypt(true)
            .build()
    }

    /// Public area passed to `TPM2_CreatePrimary`
    ///
    /// Children are protected with AES-128-CFB; the unique field is empty so
    /// the key depends only on the owner seed.
    pub fn to_public(&self) -> tss_esapi::Result<Public> {
        let builder = PublicBuilder::new()
            .with_name_hashing_algorithm(HashingAlgorithm::Sha256)
            .with_object_attributes(self.object_attributes()?);

        match self.algorithm {
            Algorithm::Rsa => builder
                .with_public_algorithm(PublicAlgorithm::Rsa)
                .with_rsa_parameters(
                    PublicRsaParametersBuilder::new_restricted_decryption_key(
                        SymmetricDefinitionObject::AES_128_CFB,
                        RsaKeyBits::Rsa2048,
                        RsaExponent::default(),
                    )
                    .build()?,
                )
                .with_rsa_unique_identifier(PublicKeyRsa::default())
                .build(),
            Algorithm::Ecc => builder
                .with_public_algorithm(PublicAlgorithm::Ecc)
                .with_ecc_parameters(
                    PublicEccParametersBuilder::new_restricted_decryption_key(
                        SymmetricDefinitionObject::AES_128_CFB,
                        EccCurve::NistP256,
                    )
                    .build()?,
                )
                .with_ecc_unique_identifier(EccPoint::default())
                .build(),
        }
    }
}
