//! kasa-vault: the password vault core
//!
//! ```text
//! passphrase ─► KDF(salt) ─► VaultKey ─┐
//!                                      ├─► AES-256-GCM ─► VaultBlob {salt, iv, content} ─► storage
//! VaultRecordStore ─► JSON ────────────┘
//! ```
//!
//! [`VaultSession`] owns the key and the decrypted records while unlocked and
//! re-encrypts the whole store after every mutation.

pub mod backup;
pub mod blob;
pub mod session;
pub mod store;

pub use blob::VaultBlob;
pub use session::{SessionOptions, VaultSession, VaultStatus};
pub use store::VaultRecordStore;

pub use kasa_core::{CredentialRecord, CredentialUpdate, NewCredential, VaultError, VaultResult};
pub use kasa_crypto::{GeneratorOptions, KdfParams};
