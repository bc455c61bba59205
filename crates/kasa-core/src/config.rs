use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{VaultError, VaultResult};

/// Top-level configuration (loaded from kasa.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KasaConfig {
    pub storage: StorageConfig,
    pub kdf: KdfConfig,
    pub passphrase: PassphraseConfig,
    pub generator: GeneratorConfig,
    pub log: LogConfig,
}

impl KasaConfig {
    /// Parse the TOML file at `path`, `None` if there is no such file.
    ///
    /// A missing file is not an error; the caller falls back to defaults and
    /// warns once logging is up.
    pub fn read(path: &Path) -> VaultResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| VaultError::Config(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend: "fs" or "memory"
    pub backend: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Key under which the encrypted vault document is stored
    pub key: String,
}

/// Key derivation settings.
///
/// The persisted blob does not record the iteration count, so changing it
/// makes existing vaults unreadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// PBKDF2-HMAC-SHA256 iterations (default: 100000)
    pub iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassphraseConfig {
    /// Minimum master passphrase length in characters (default: 6)
    pub min_length: usize,
}

/// Defaults for the password generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub length: usize,
    pub upper: bool,
    pub numbers: bool,
    pub symbols: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "fs".into(),
            root: PathBuf::from("~/.local/share/kasa"),
            key: "vault_data".into(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: 100_000,
        }
    }
}

impl Default for PassphraseConfig {
    fn default() -> Self {
        Self { min_length: 6 }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            length: 16,
            upper: true,
            numbers: true,
            symbols: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}
