use std::fmt;
use zeroize::Zeroizing;

/// Operator-supplied password
///
/// Arbitrary bytes; the module never sees it, only the value derived from it.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<Vec<u8>>);

impl Password {
    pub fn new(password: Vec<u8>) -> Self {
        Self(Zeroizing::new(password))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password.as_bytes().to_vec())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password([REDACTED])")
    }
}

/// Password plus the per-blob salt recorded at seal time
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSecret {
    pub password: Password,
    pub salt: Vec<u8>,
}

impl AuthSecret {
    pub fn new(password: Password, salt: Vec<u8>) -> Self {
        Self { password, salt }
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSecret")
            .field("password", &self.password)
            .field("salt", &hex::encode(&self.salt))
            .finish()
    }
}
