//! kasa-crypto: cryptographic primitives for the kasa password vault
//!
//! Compatible with the browser vault's Web Crypto usage:
//! ```text
//! Vault Key (256-bit, PBKDF2-HMAC-SHA256 from passphrase, 100k rounds, 16-byte salt)
//!   └── Record list AEAD: AES-256-GCM (nonce=random_96bit, tag appended to ciphertext)
//! ```
//!
//! The key is never serialized; the salt is stored in the clear next to the
//! ciphertext. Decryption is the only passphrase check there is.

pub mod cipher;
pub mod generator;
pub mod kdf;

pub use cipher::{decrypt, encrypt, generate_nonce, seal, CryptoError};
pub use generator::{generate_password, GeneratorOptions};
pub use kdf::{derive_vault_key, generate_salt, KdfParams, VaultKey};

/// Size of a vault key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a KDF salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
