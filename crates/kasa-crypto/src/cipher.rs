//! AES-256-GCM encryption of the serialized record list
//!
//! Layout matches Web Crypto's `AES-GCM` output:
//! ```text
//! ciphertext = [N bytes: encrypted payload][16 bytes: GCM tag]
//! nonce      = 12 random bytes, stored separately ("iv")
//! ```
//!
//! A (key, nonce) pair must never encrypt two different plaintexts, so every
//! call to [`seal`] draws a fresh nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::kdf::VaultKey;
use crate::{NONCE_SIZE, TAG_SIZE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Wrong key, wrong nonce or tampered ciphertext; GCM cannot tell them apart.
    #[error("authentication failed: invalid key or corrupted data")]
    AuthenticationFailed,

    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// Generate a fresh random 96-bit nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` with a caller-supplied nonce.
///
/// Returns the ciphertext with the 16-byte tag appended.
pub fn encrypt(
    key: &VaultKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt and authenticate `ciphertext` (payload || tag).
pub fn decrypt(
    key: &VaultKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Encrypt with a freshly generated nonce. Returns `(nonce, ciphertext)`.
pub fn seal(
    key: &VaultKey,
    plaintext: &[u8],
) -> Result<([u8; NONCE_SIZE], Vec<u8>), CryptoError> {
    let nonce = generate_nonce();
    let ciphertext = encrypt(key, &nonce, plaintext)?;
    Ok((nonce, ciphertext))
}
