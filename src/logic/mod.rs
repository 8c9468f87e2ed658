mod derive_auth;

pub use derive_auth::{
    derive_auth, derive_for_policy, AuthValue, AUTH_VALUE_LENGTH, PBKDF2_HMAC_SHA256_ITERATIONS,
};
