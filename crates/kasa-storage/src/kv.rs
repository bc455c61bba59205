//! String key-value store over an OpenDAL Operator

use anyhow::{Context, Result};
use opendal::Operator;

#[derive(Debug, Clone)]
pub struct KeyValueStore {
    op: Operator,
}

impl KeyValueStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    /// A process-local store backed by OpenDAL's memory service.
    pub fn memory() -> Result<Self> {
        let op = Operator::new(opendal::services::Memory::default())
            .context("creating memory operator")?
            .finish();
        Ok(Self::new(op))
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Read the value stored under `key`, `None` if absent.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.op.read(key).await {
            Ok(buf) => {
                let value = String::from_utf8(buf.to_vec())
                    .with_context(|| format!("value under '{key}' is not UTF-8"))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("reading '{key}': {e}")),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.op
            .write(key, value.as_bytes().to_vec())
            .await
            .map_err(|e| anyhow::anyhow!("writing '{key}': {e}"))?;
        tracing::trace!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.op
            .delete(key)
            .await
            .map_err(|e| anyhow::anyhow!("removing '{key}': {e}"))
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasa_core::config::StorageConfig;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = KeyValueStore::memory().unwrap();
        assert_eq!(store.get("vault_data").await.unwrap(), None);
        assert!(!store.contains("vault_data").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let store = KeyValueStore::memory().unwrap();

        store.set("vault_data", "first").await.unwrap();
        assert_eq!(store.get("vault_data").await.unwrap().as_deref(), Some("first"));

        store.set("vault_data", "second").await.unwrap();
        assert_eq!(store.get("vault_data").await.unwrap().as_deref(), Some("second"));

        store.remove("vault_data").await.unwrap();
        assert_eq!(store.get("vault_data").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_missing_succeeds() {
        let store = KeyValueStore::memory().unwrap();
        store.remove("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_backend_persists_across_operators() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig {
            backend: "fs".into(),
            root: dir.path().to_path_buf(),
            ..Default::default()
        };

        let first = KeyValueStore::new(crate::build_operator(&cfg).unwrap());
        first.set("vault_data", r#"{"salt":[]}"#).await.unwrap();

        let second = KeyValueStore::new(crate::build_operator(&cfg).unwrap());
        assert_eq!(
            second.get("vault_data").await.unwrap().as_deref(),
            Some(r#"{"salt":[]}"#)
        );
        assert!(dir.path().join("vault_data").exists());
    }
}
