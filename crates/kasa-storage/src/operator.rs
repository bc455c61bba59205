//! OpenDAL Operator factory for kasa storage backends

use anyhow::{Context, Result};
use opendal::Operator;

use kasa_core::config::{expand_tilde, StorageConfig};

/// Build an OpenDAL Operator for the configured backend.
///
/// - `fs`: one file per key under `root`; writes go through a temp dir and
///   are renamed into place, so a crash never leaves a half-written vault.
/// - `memory`: process-local, for tests and dry runs.
///
/// No retry layer: a failed write is surfaced, never retried behind the
/// caller's back.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    let op = match cfg.backend.as_str() {
        "fs" => {
            let root = expand_tilde(&cfg.root);
            let tmp = root.join(".tmp");
            let builder = opendal::services::Fs::default()
                .root(&root.to_string_lossy())
                .atomic_write_dir(&tmp.to_string_lossy());
            Operator::new(builder)
                .with_context(|| format!("creating fs operator at {}", root.display()))?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        "memory" => Operator::new(opendal::services::Memory::default())
            .context("creating memory operator")?
            .layer(opendal::layers::LoggingLayer::default())
            .finish(),
        other => anyhow::bail!("unknown storage backend: {other} (expected \"fs\" or \"memory\")"),
    };

    tracing::debug!(backend = %cfg.backend, "storage operator ready");
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_operator() {
        let cfg = StorageConfig {
            backend: "memory".into(),
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_build_fs_operator() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig {
            backend: "fs".into(),
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_unknown_backend() {
        let cfg = StorageConfig {
            backend: "s3".into(),
            ..Default::default()
        };
        let err = build_operator(&cfg).unwrap_err();
        assert!(err.to_string().contains("unknown storage backend"));
    }
}
