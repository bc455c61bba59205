//! Vault session state machine
//!
//! ```text
//!  Uninitialized ──create_vault──► Unlocked ◄──login── Locked
//!        ▲                           │  ▲                 ▲
//!        │                       lock│  └─ add/update/    │
//!        │                           ▼     delete/persist │
//!        └───── (no blob) ─────── Locked ◄─restore_blob───┘
//! ```
//!
//! The session is the only owner of the derived key and the decrypted
//! records. Both are zeroized when the session locks or is dropped.
//! Operations take `&mut self`, so a caller can never run two of them at
//! once on the same session.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use kasa_core::config::KasaConfig;
use kasa_core::{CredentialRecord, CredentialUpdate, NewCredential, VaultError, VaultResult};
use kasa_crypto::{derive_vault_key, generate_salt, GeneratorOptions, KdfParams, VaultKey, SALT_SIZE};
use kasa_storage::KeyValueStore;

use crate::blob::VaultBlob;
use crate::store::VaultRecordStore;

/// Storage key used by the browser vault.
pub const DEFAULT_STORAGE_KEY: &str = "vault_data";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Key under which the vault blob lives in storage
    pub storage_key: String,
    pub kdf: KdfParams,
    /// Minimum passphrase length (characters) for new passphrases
    pub min_passphrase_len: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.into(),
            kdf: KdfParams::default(),
            min_passphrase_len: 6,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &KasaConfig) -> Self {
        Self {
            storage_key: config.storage.key.clone(),
            kdf: KdfParams {
                iterations: config.kdf.iterations,
            },
            min_passphrase_len: config.passphrase.min_length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    /// No vault in storage
    Uninitialized,
    /// A vault exists; no key in memory
    Locked,
    /// Key and decrypted records in memory
    Unlocked,
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultStatus::Uninitialized => write!(f, "uninitialized"),
            VaultStatus::Locked => write!(f, "locked"),
            VaultStatus::Unlocked => write!(f, "unlocked"),
        }
    }
}

struct Unlocked {
    key: VaultKey,
    salt: [u8; SALT_SIZE],
    records: VaultRecordStore,
}

enum SessionState {
    Uninitialized,
    Locked,
    Unlocked(Unlocked),
}

pub struct VaultSession {
    storage: KeyValueStore,
    options: SessionOptions,
    state: SessionState,
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("storage_key", &self.options.storage_key)
            .field("status", &self.status())
            .finish()
    }
}

impl VaultSession {
    /// Start a session, `Locked` if a vault exists in storage and
    /// `Uninitialized` otherwise.
    pub async fn open(storage: KeyValueStore, options: SessionOptions) -> VaultResult<Self> {
        options.kdf.validate();
        let exists = storage
            .contains(&options.storage_key)
            .await
            .map_err(storage_error)?;
        let state = if exists {
            SessionState::Locked
        } else {
            SessionState::Uninitialized
        };
        Ok(Self {
            storage,
            options,
            state,
        })
    }

    pub fn status(&self) -> VaultStatus {
        match self.state {
            SessionState::Uninitialized => VaultStatus::Uninitialized,
            SessionState::Locked => VaultStatus::Locked,
            SessionState::Unlocked(_) => VaultStatus::Unlocked,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Create a new vault with an empty record list and unlock it.
    ///
    /// Nothing is written unless every passphrase check passes.
    pub async fn create_vault(
        &mut self,
        passphrase: &SecretString,
        confirm: &SecretString,
    ) -> VaultResult<()> {
        check_new_passphrase(passphrase, confirm, self.options.min_passphrase_len)?;
        if self.load_blob().await?.is_some() {
            return Err(VaultError::VaultExists);
        }

        let salt = generate_salt();
        let key = derive_key(passphrase, salt, self.options.kdf).await?;
        let records = VaultRecordStore::new();

        let blob = seal_records(&key, salt, &records)?;
        write_blob(&self.storage, &self.options.storage_key, &blob).await?;

        self.state = SessionState::Unlocked(Unlocked { key, salt, records });
        info!("vault created");
        Ok(())
    }

    /// Unlock the stored vault. A successful decryption is the passphrase check.
    pub async fn login(&mut self, passphrase: &SecretString) -> VaultResult<()> {
        let blob = self.load_blob().await?.ok_or(VaultError::NoVault)?;
        let key = derive_key(passphrase, blob.salt, self.options.kdf).await?;

        let plaintext = match kasa_crypto::decrypt(&key, &blob.nonce, &blob.ciphertext) {
            Ok(p) => p,
            Err(_) => {
                warn!("vault login failed");
                return Err(VaultError::AuthenticationFailure);
            }
        };
        let records = VaultRecordStore::from_json(&plaintext)?;

        info!(records = records.len(), "vault unlocked");
        self.state = SessionState::Unlocked(Unlocked {
            key,
            salt: blob.salt,
            records,
        });
        Ok(())
    }

    /// Drop the key and the decrypted records. No-op unless unlocked.
    pub fn lock(&mut self) {
        if let SessionState::Unlocked(_) = self.state {
            self.state = SessionState::Locked;
            info!("vault locked");
        }
    }

    /// Re-encrypt the current records under a fresh nonce and overwrite
    /// the stored blob. The salt never changes here.
    pub async fn persist(&mut self) -> VaultResult<()> {
        let unlocked = unlocked_ref(&self.state)?;
        write_records(&self.storage, &self.options.storage_key, unlocked, &unlocked.records).await
    }

    pub async fn add(&mut self, input: NewCredential) -> VaultResult<CredentialRecord> {
        let unlocked = unlocked_mut(&mut self.state)?;
        let mut next = unlocked.records.clone();
        let record = next.add(input)?;

        write_records(&self.storage, &self.options.storage_key, unlocked, &next).await?;
        unlocked.records = next;
        debug!(id = %record.id, "record added");
        Ok(record)
    }

    pub async fn update(
        &mut self,
        id: &str,
        update: CredentialUpdate,
    ) -> VaultResult<CredentialRecord> {
        let unlocked = unlocked_mut(&mut self.state)?;
        let mut next = unlocked.records.clone();
        let record = next.update(id, update)?;

        write_records(&self.storage, &self.options.storage_key, unlocked, &next).await?;
        unlocked.records = next;
        debug!(id, "record updated");
        Ok(record)
    }

    pub async fn delete(&mut self, id: &str) -> VaultResult<()> {
        let unlocked = unlocked_mut(&mut self.state)?;
        let mut next = unlocked.records.clone();
        next.delete(id)?;

        write_records(&self.storage, &self.options.storage_key, unlocked, &next).await?;
        unlocked.records = next;
        debug!(id, "record deleted");
        Ok(())
    }

    pub fn find(&self, id: &str) -> VaultResult<&CredentialRecord> {
        unlocked_ref(&self.state)?.records.find(id)
    }

    pub fn search(&self, query: &str) -> VaultResult<Vec<&CredentialRecord>> {
        Ok(unlocked_ref(&self.state)?.records.search(query))
    }

    pub fn records(&self) -> VaultResult<&VaultRecordStore> {
        Ok(&unlocked_ref(&self.state)?.records)
    }

    /// The stored blob, as persisted. No decryption happens.
    pub async fn export_blob(&self) -> VaultResult<VaultBlob> {
        unlocked_ref(&self.state)?;
        self.load_blob().await?.ok_or(VaultError::NoVault)
    }

    /// Replace the stored vault with `blob` without decrypting it.
    ///
    /// The session ends up `Locked`: whoever imported the blob must log in
    /// with that vault's passphrase.
    pub async fn restore_blob(&mut self, blob: VaultBlob) -> VaultResult<()> {
        write_blob(&self.storage, &self.options.storage_key, &blob).await?;
        self.state = SessionState::Locked;
        info!("vault restored from backup; login required");
        Ok(())
    }

    /// Parse an exported document strictly, then restore it.
    pub async fn restore_json(&mut self, text: &str) -> VaultResult<()> {
        let blob = VaultBlob::from_json(text)?;
        self.restore_blob(blob).await
    }

    /// Re-key the vault under a new passphrase and a fresh salt.
    ///
    /// The stored blob is replaced only after the records were encrypted
    /// under the new key; on any failure the old vault stays intact.
    pub async fn change_passphrase(
        &mut self,
        current: &SecretString,
        new: &SecretString,
        confirm: &SecretString,
    ) -> VaultResult<()> {
        unlocked_ref(&self.state)?;
        check_new_passphrase(new, confirm, self.options.min_passphrase_len)?;

        let stored = self.load_blob().await?.ok_or(VaultError::NoVault)?;
        let current_key = derive_key(current, stored.salt, self.options.kdf).await?;
        if kasa_crypto::decrypt(&current_key, &stored.nonce, &stored.ciphertext).is_err() {
            warn!("passphrase change rejected: current passphrase did not verify");
            return Err(VaultError::AuthenticationFailure);
        }

        let salt = generate_salt();
        let key = derive_key(new, salt, self.options.kdf).await?;

        let unlocked = unlocked_mut(&mut self.state)?;
        let blob = seal_records(&key, salt, &unlocked.records)?;
        write_blob(&self.storage, &self.options.storage_key, &blob).await?;

        unlocked.key = key;
        unlocked.salt = salt;
        info!("vault passphrase changed");
        Ok(())
    }

    /// Generate a random password.
    pub fn generate(&self, options: &GeneratorOptions) -> String {
        kasa_crypto::generate_password(options)
    }

    async fn load_blob(&self) -> VaultResult<Option<VaultBlob>> {
        let raw = self
            .storage
            .get(&self.options.storage_key)
            .await
            .map_err(storage_error)?;
        raw.as_deref().map(VaultBlob::from_json).transpose()
    }
}

fn unlocked_ref(state: &SessionState) -> VaultResult<&Unlocked> {
    match state {
        SessionState::Unlocked(u) => Ok(u),
        SessionState::Uninitialized => Err(VaultError::NoVault),
        SessionState::Locked => Err(VaultError::Locked),
    }
}

fn unlocked_mut(state: &mut SessionState) -> VaultResult<&mut Unlocked> {
    match state {
        SessionState::Unlocked(u) => Ok(u),
        SessionState::Uninitialized => Err(VaultError::NoVault),
        SessionState::Locked => Err(VaultError::Locked),
    }
}

/// Empty, mismatched, or short passphrases are rejected before any key
/// derivation happens.
fn check_new_passphrase(
    passphrase: &SecretString,
    confirm: &SecretString,
    min_len: usize,
) -> VaultResult<()> {
    let passphrase = passphrase.expose_secret();
    if passphrase.is_empty() {
        return Err(VaultError::PassphraseTooShort { min: min_len });
    }
    if passphrase != confirm.expose_secret() {
        return Err(VaultError::PassphraseMismatch);
    }
    if passphrase.chars().count() < min_len {
        return Err(VaultError::PassphraseTooShort { min: min_len });
    }
    Ok(())
}

/// Run the KDF on the blocking pool.
async fn derive_key(
    passphrase: &SecretString,
    salt: [u8; SALT_SIZE],
    params: KdfParams,
) -> VaultResult<VaultKey> {
    let passphrase = SecretString::from(passphrase.expose_secret());
    tokio::task::spawn_blocking(move || derive_vault_key(&passphrase, &salt, &params))
        .await
        .map_err(|e| VaultError::Other(anyhow::anyhow!("key derivation task failed: {e}")))
}

fn seal_records(
    key: &VaultKey,
    salt: [u8; SALT_SIZE],
    records: &VaultRecordStore,
) -> VaultResult<VaultBlob> {
    let plaintext = records.to_json()?;
    let (nonce, ciphertext) = kasa_crypto::seal(key, &plaintext)
        .map_err(|e| VaultError::Other(anyhow::anyhow!(e)))?;
    Ok(VaultBlob {
        salt,
        nonce,
        ciphertext,
    })
}

async fn write_records(
    storage: &KeyValueStore,
    storage_key: &str,
    unlocked: &Unlocked,
    records: &VaultRecordStore,
) -> VaultResult<()> {
    let blob = seal_records(&unlocked.key, unlocked.salt, records)?;
    write_blob(storage, storage_key, &blob).await?;
    debug!(
        records = records.len(),
        bytes = blob.ciphertext.len(),
        "vault persisted"
    );
    Ok(())
}

async fn write_blob(storage: &KeyValueStore, storage_key: &str, blob: &VaultBlob) -> VaultResult<()> {
    storage
        .set(storage_key, &blob.to_json()?)
        .await
        .map_err(storage_error)
}

fn storage_error(e: anyhow::Error) -> VaultError {
    VaultError::Storage(format!("{e:#}"))
}
