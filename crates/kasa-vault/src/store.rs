//! In-memory credential list: pure data operations, no crypto, no I/O.
//!
//! Insertion order is the display order and survives encrypt/decrypt.

use zeroize::Zeroizing;

use kasa_core::types::non_empty;
use kasa_core::{CredentialRecord, CredentialUpdate, NewCredential, VaultError, VaultResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultRecordStore {
    records: Vec<CredentialRecord>,
}

impl VaultRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from decrypted records, enforcing id uniqueness.
    ///
    /// Normalizes the browser vault's loose shapes: empty `username`/`notes`
    /// become absent and a missing `updatedAt` inherits `createdAt`.
    pub fn from_records(mut records: Vec<CredentialRecord>) -> VaultResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for record in &mut records {
            if record.id.is_empty() {
                return Err(VaultError::MalformedVault("record with empty id".into()));
            }
            if !seen.insert(record.id.clone()) {
                return Err(VaultError::MalformedVault(format!(
                    "duplicate record id: {}",
                    record.id
                )));
            }
            record.username = non_empty(record.username.take());
            record.notes = non_empty(record.notes.take());
            if record.updated_at == 0 {
                record.updated_at = record.created_at;
            }
        }
        Ok(Self { records })
    }

    /// Parse the decrypted JSON array.
    pub fn from_json(plaintext: &[u8]) -> VaultResult<Self> {
        let records: Vec<CredentialRecord> = serde_json::from_slice(plaintext)
            .map_err(|e| VaultError::MalformedVault(format!("record list: {e}")))?;
        Self::from_records(records)
    }

    /// Serialize to the JSON array that gets encrypted.
    pub fn to_json(&self) -> VaultResult<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(&self.records)
            .map(Zeroizing::new)
            .map_err(|e| VaultError::Other(anyhow::anyhow!("serializing records: {e}")))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CredentialRecord> {
        self.records.iter()
    }

    /// Append a new record with a fresh id; returns a copy of it.
    pub fn add(&mut self, input: NewCredential) -> VaultResult<CredentialRecord> {
        self.add_at(input, now_millis())
    }

    fn add_at(&mut self, input: NewCredential, now: i64) -> VaultResult<CredentialRecord> {
        require_non_empty("title", &input.title)?;
        require_non_empty("password", &input.password)?;

        let record = CredentialRecord {
            id: self.fresh_id(),
            title: input.title,
            username: non_empty(input.username),
            password: input.password,
            notes: non_empty(input.notes),
            created_at: now,
            updated_at: now,
        };
        self.records.push(record.clone());
        Ok(record)
    }

    /// Apply a patch in place, keeping the record's position.
    pub fn update(&mut self, id: &str, update: CredentialUpdate) -> VaultResult<CredentialRecord> {
        self.update_at(id, update, now_millis())
    }

    fn update_at(
        &mut self,
        id: &str,
        update: CredentialUpdate,
        now: i64,
    ) -> VaultResult<CredentialRecord> {
        let index = self.position(id)?;
        if let Some(title) = &update.title {
            require_non_empty("title", title)?;
        }
        if let Some(password) = &update.password {
            require_non_empty("password", password)?;
        }

        let record = &mut self.records[index];
        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(username) = update.username {
            record.username = non_empty(Some(username));
        }
        if let Some(password) = update.password {
            record.password = password;
        }
        if let Some(notes) = update.notes {
            record.notes = non_empty(Some(notes));
        }
        record.updated_at = now;
        Ok(record.clone())
    }

    /// Remove a record, returning it.
    pub fn delete(&mut self, id: &str) -> VaultResult<CredentialRecord> {
        let index = self.position(id)?;
        Ok(self.records.remove(index))
    }

    pub fn find(&self, id: &str) -> VaultResult<&CredentialRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Case-insensitive substring match on title or username, in insertion
    /// order. The empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&CredentialRecord> {
        let needle = query.to_lowercase();
        self.records
            .iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r
                        .username
                        .as_deref()
                        .is_some_and(|u| u.to_lowercase().contains(&needle))
            })
            .collect()
    }

    fn position(&self, id: &str) -> VaultResult<usize> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if !self.records.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> VaultResult<()> {
    if value.is_empty() {
        return Err(VaultError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
