//! Persisted vault document
//!
//! ```json
//! { "salt":    [16 byte values],
//!   "iv":      [12 byte values],
//!   "content": [ciphertext bytes, GCM tag last] }
//! ```
//!
//! Byte arrays as JSON integer lists are what the browser vault wrote to
//! `localStorage`, so its exports load here unchanged. Parsing is strict:
//! unknown fields, wrong lengths, or non-byte values are `MalformedVault`.

use serde::{Deserialize, Serialize};

use kasa_core::{VaultError, VaultResult};
use kasa_crypto::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBlob", into = "RawBlob")]
pub struct VaultBlob {
    /// KDF salt, fixed at vault creation
    pub salt: [u8; SALT_SIZE],
    /// AES-GCM nonce, fresh for every encryption
    pub nonce: [u8; NONCE_SIZE],
    /// Encrypted record list with the tag appended
    pub ciphertext: Vec<u8>,
}

impl VaultBlob {
    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string(self)
            .map_err(|e| VaultError::Other(anyhow::anyhow!("serializing vault blob: {e}")))
    }

    pub fn from_json(text: &str) -> VaultResult<Self> {
        serde_json::from_str(text).map_err(|e| VaultError::MalformedVault(e.to_string()))
    }
}

impl std::fmt::Debug for VaultBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultBlob")
            .field("salt", &self.salt)
            .field("nonce", &self.nonce)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBlob {
    salt: Vec<u8>,
    iv: Vec<u8>,
    content: Vec<u8>,
}

impl TryFrom<RawBlob> for VaultBlob {
    type Error = String;

    fn try_from(raw: RawBlob) -> Result<Self, Self::Error> {
        let salt: [u8; SALT_SIZE] = raw.salt.as_slice().try_into().map_err(|_| {
            format!("salt must be {SALT_SIZE} bytes, got {}", raw.salt.len())
        })?;
        let nonce: [u8; NONCE_SIZE] = raw.iv.as_slice().try_into().map_err(|_| {
            format!("iv must be {NONCE_SIZE} bytes, got {}", raw.iv.len())
        })?;
        if raw.content.len() < TAG_SIZE {
            return Err(format!(
                "content too short: {} bytes (minimum {TAG_SIZE})",
                raw.content.len()
            ));
        }
        Ok(VaultBlob {
            salt,
            nonce,
            ciphertext: raw.content,
        })
    }
}

impl From<VaultBlob> for RawBlob {
    fn from(blob: VaultBlob) -> Self {
        RawBlob {
            salt: blob.salt.to_vec(),
            iv: blob.nonce.to_vec(),
            content: blob.ciphertext,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultBlob {
        VaultBlob {
            salt: [1u8; SALT_SIZE],
            nonce: [2u8; NONCE_SIZE],
            ciphertext: vec![3u8; 20],
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = sample().to_json().unwrap();
        assert!(json.starts_with(r#"{"salt":[1,1,"#));
        assert!(json.contains(r#""iv":[2,2,"#));
        assert!(json.contains(r#""content":[3,3,"#));
    }

    #[test]
    fn test_parse_browser_export() {
        let salt: Vec<String> = (0..16).map(|i| i.to_string()).collect();
        let iv: Vec<String> = (100..112).map(|i| i.to_string()).collect();
        let content: Vec<String> = (0..17).map(|_| "255".to_string()).collect();
        let json = format!(
            r#"{{"salt":[{}],"iv":[{}],"content":[{}]}}"#,
            salt.join(","),
            iv.join(","),
            content.join(",")
        );

        let blob = VaultBlob::from_json(&json).unwrap();
        assert_eq!(blob.salt[15], 15);
        assert_eq!(blob.nonce[0], 100);
        assert_eq!(blob.ciphertext.len(), 17);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = VaultBlob::from_json(r#"{"salt":[],"content":[]}"#).unwrap_err();
        assert!(matches!(err, VaultError::MalformedVault(_)));
    }

    #[test]
    fn test_wrong_salt_length_is_malformed() {
        let mut raw: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        raw["salt"] = serde_json::json!([1, 2, 3]);

        let err = VaultBlob::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, VaultError::MalformedVault(msg) if msg.contains("salt")));
    }

    #[test]
    fn test_wrong_iv_length_is_malformed() {
        let mut raw: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        raw["iv"] = serde_json::json!(vec![0u8; 16]);

        assert!(VaultBlob::from_json(&raw.to_string()).is_err());
    }

    #[test]
    fn test_short_content_is_malformed() {
        let mut raw: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        raw["content"] = serde_json::json!([1, 2, 3]);

        assert!(VaultBlob::from_json(&raw.to_string()).is_err());
    }

    #[test]
    fn test_non_byte_values_are_malformed() {
        let mut raw: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        raw["content"][0] = serde_json::json!(256);
        assert!(VaultBlob::from_json(&raw.to_string()).is_err());

        raw["content"][0] = serde_json::json!("a");
        assert!(VaultBlob::from_json(&raw.to_string()).is_err());
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let mut raw: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        raw["version"] = serde_json::json!(2);

        assert!(VaultBlob::from_json(&raw.to_string()).is_err());
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = VaultBlob::from_json("not json at all").unwrap_err();
        assert!(matches!(err, VaultError::MalformedVault(_)));
    }

    #[test]
    fn test_debug_hides_ciphertext() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("ciphertext_len: 20"));
    }
}
