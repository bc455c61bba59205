use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A single credential kept inside the encrypted vault.
///
/// Only ever exists in plaintext inside an unlocked session; the whole list
/// is serialized and encrypted before it touches storage. Field names follow
/// the browser vault's JSON (`createdAt`, `updatedAt`, Unix milliseconds).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Opaque unique identifier (UUID v4), immutable
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    /// Older exports omit this; loaders backfill it from `created_at`
    #[serde(default)]
    pub updated_at: i64,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("notes", &self.notes.as_ref().map(|_| "[REDACTED]"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Input for adding a credential. The store assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCredential {
    pub title: String,
    pub username: Option<String>,
    pub password: String,
    pub notes: Option<String>,
}

/// Partial update of a credential's mutable fields.
///
/// `None` leaves a field untouched. `Some("")` clears `username` or `notes`;
/// for `title` and `password` it is rejected, both are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialUpdate {
    pub title: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
}

impl CredentialUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.notes.is_none()
    }
}

/// Treat empty optional text the same as absent, as the browser vault did.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CredentialRecord {
        CredentialRecord {
            id: "0b5c3f9e-1111-4a2b-9c3d-000000000001".into(),
            title: "Email".into(),
            username: Some("alice".into()),
            password: "p@ss".into(),
            notes: None,
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"createdAt\":1700000000000"));
        assert!(json.contains("\"updatedAt\":1700000000000"));
        assert!(!json.contains("notes"), "absent notes are not serialized");
    }

    #[test]
    fn test_record_parses_browser_shape() {
        // Shape written by the browser vault: empty strings, no updatedAt
        let json = r#"{"id":"x","title":"Bank","username":"","password":"pw","notes":"","createdAt":5}"#;
        let record: CredentialRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "Bank");
        assert_eq!(record.username.as_deref(), Some(""));
        assert_eq!(record.updated_at, 0);
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("p@ss"));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("a".into())), Some("a".into()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(CredentialUpdate::default().is_empty());
        let update = CredentialUpdate {
            notes: Some(String::new()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
