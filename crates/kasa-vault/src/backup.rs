//! Backup files: the exported vault document on disk.
//!
//! A backup is the stored blob verbatim; it stays encrypted and can only be
//! opened with the passphrase of the vault it came from.

use std::path::Path;

use chrono::NaiveDate;

use kasa_core::{VaultError, VaultResult};

use crate::blob::VaultBlob;

/// File name for a backup taken on `date`, e.g. `kasa-backup-2026-10-18.json`.
pub fn default_backup_name(date: NaiveDate) -> String {
    format!("kasa-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Write `blob` to `path` (temp file then rename).
pub async fn write_backup(path: &Path, blob: &VaultBlob) -> VaultResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("creating", parent, e))?;
    }

    let json = blob.to_json()?;
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| io_error("writing", &tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| io_error("renaming", path, e))?;

    tracing::info!(path = %path.display(), "vault backup written");
    Ok(())
}

/// Read and strictly parse a backup file.
pub async fn read_backup(path: &Path) -> VaultResult<VaultBlob> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_error("reading", path, e))?;
    VaultBlob::from_json(&text)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> VaultError {
    VaultError::Storage(format!("{action} {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultBlob {
        VaultBlob {
            salt: [9u8; 16],
            nonce: [8u8; 12],
            ciphertext: vec![7u8; 32],
        }
    }

    #[test]
    fn test_default_backup_name() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(default_backup_name(date), "kasa-backup-2026-03-07.json");
    }

    #[tokio::test]
    async fn test_write_read_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/backup.json");

        write_backup(&path, &sample()).await.unwrap();
        let restored = read_backup(&path).await.unwrap();

        assert_eq!(restored, sample());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_backup() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_backup(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, VaultError::Storage(_)));
    }

    #[tokio::test]
    async fn test_read_malformed_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, r#"{"salt":[1],"iv":[2]}"#).await.unwrap();

        let err = read_backup(&path).await.unwrap_err();
        assert!(matches!(err, VaultError::MalformedVault(_)));
    }
}
