pub mod keystore;
pub mod logging;
pub mod storage;

pub use keystore::{ExtendedKey, KeyDerivation, SoftwareKeyStore};
pub use storage::{DirectoryStorage, RemovableStorage};
