mod algorithm;
mod handle;
mod password;
mod pcr;
mod policy;
mod sealed_blob;
mod secret;
mod template;

pub use algorithm::{Algorithm, AlgorithmError};
pub use handle::Handle;
pub use password::{AuthSecret, Password};
pub use pcr::{PcrBank, PcrError, PcrSelection};
pub use policy::PolicySpec;
pub use sealed_blob::SealedBlob;
pub use secret::UnsealedSecret;
pub use template::RootKeyTemplate;
