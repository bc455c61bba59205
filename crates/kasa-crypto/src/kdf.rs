//! Key derivation: PBKDF2-HMAC-SHA256 passphrase → vault key

use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{KEY_SIZE, SALT_SIZE};

/// Iteration count used by the browser vault and recommended for new vaults.
pub const RECOMMENDED_ITERATIONS: u32 = 100_000;

/// A 256-bit vault key derived from the master passphrase.
///
/// Lives only in process memory for the duration of an unlocked session.
/// Zeroized on drop. Neither `Serialize` nor `Clone`.
pub struct VaultKey {
    bytes: [u8; KEY_SIZE],
}

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for VaultKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters.
///
/// The vault blob stores no parameters, so every party reading a vault must
/// use the same iteration count it was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: RECOMMENDED_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Warn when the iteration count is below the recommended value.
    pub fn validate(&self) {
        if self.iterations < RECOMMENDED_ITERATIONS {
            tracing::warn!(
                iterations = self.iterations,
                recommended = RECOMMENDED_ITERATIONS,
                "PBKDF2 iterations below recommended value"
            );
        }
    }
}

/// Generate a fresh random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive a 256-bit vault key from a passphrase and salt.
///
/// Deterministic and infallible: any passphrase, including the empty one,
/// yields a key. Passphrase policy is the session layer's job. Slow at the
/// recommended iteration count; async callers run it on a blocking thread.
pub fn derive_vault_key(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> VaultKey {
    // derive straight into the key's own buffer so no bare copy is left behind
    let mut key = VaultKey::from_bytes([0u8; KEY_SIZE]);
    stretch(
        passphrase.expose_secret().as_bytes(),
        salt,
        params.iterations.max(1),
        &mut key.bytes,
    );
    key
}

fn stretch(passphrase: &[u8], salt: &[u8], iterations: u32, out: &mut [u8; KEY_SIZE]) {
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_pbkdf2_sha256_known_vector() {
        // PBKDF2-HMAC-SHA256, P="password", S="salt", c=1, dkLen=32
        let mut key = [0u8; KEY_SIZE];
        stretch(b"password", b"salt", 1, &mut key);
        assert_eq!(
            hex(&key),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn test_derive_fills_key_buffer() {
        let passphrase = SecretString::from("secret1");
        let salt = [5u8; SALT_SIZE];

        let mut expected = zeroize::Zeroizing::new([0u8; KEY_SIZE]);
        stretch(b"secret1", &salt, 1_000, &mut expected);

        let key = derive_vault_key(&passphrase, &salt, &fast());
        assert_eq!(key.as_bytes(), &*expected);
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("secret1");
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_vault_key(&passphrase, &salt, &fast());
        let key2 = derive_vault_key(&passphrase, &salt, &fast());

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_vault_key(&SecretString::from("secret1"), &salt, &fast());
        let key2 = derive_vault_key(&SecretString::from("secret2"), &salt, &fast());

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        let key1 = derive_vault_key(&passphrase, &[1u8; SALT_SIZE], &fast());
        let key2 = derive_vault_key(&passphrase, &[2u8; SALT_SIZE], &fast());

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_iteration_count_matters() {
        let passphrase = SecretString::from("secret1");
        let salt = [7u8; SALT_SIZE];

        let key1 = derive_vault_key(&passphrase, &salt, &KdfParams { iterations: 1 });
        let key2 = derive_vault_key(&passphrase, &salt, &KdfParams { iterations: 2 });

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_accepts_empty_passphrase() {
        let key = derive_vault_key(&SecretString::from(""), &[0u8; SALT_SIZE], &fast());
        assert_ne!(key.as_bytes(), &[0u8; KEY_SIZE]);
    }

    #[test]
    fn test_zero_iterations_clamped() {
        let passphrase = SecretString::from("secret1");
        let salt = [3u8; SALT_SIZE];

        let key0 = derive_vault_key(&passphrase, &salt, &KdfParams { iterations: 0 });
        let key1 = derive_vault_key(&passphrase, &salt, &KdfParams { iterations: 1 });

        assert_eq!(key0.as_bytes(), key1.as_bytes());
    }

    #[test]
    fn test_salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = VaultKey::from_bytes([9u8; KEY_SIZE]);
        assert!(format!("{key:?}").contains("[REDACTED]"));
    }
}
