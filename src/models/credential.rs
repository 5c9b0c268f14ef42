use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A credential as stored in the origin store, document id = `sha256(key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub key: String,
    pub expires_at: DateTime<Utc>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

impl Credential {
    pub fn hash(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validity = active ∧ now < expiry (§3).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialMeta {
    pub total_count: i64,
    pub active_count: i64,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_key_added: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCredential {
    pub key: String,
    pub expires_at: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialUpdate {
    pub expires_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub active: Option<bool>,
}

/// Predicate set for `list(filter)` (§4.B).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialFilter {
    pub active: Option<bool>,
    pub source: Option<String>,
    pub expires_after: Option<DateTime<Utc>>,
    pub expires_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_sha256() {
        let a = Credential::hash("secret-token");
        let b = Credential::hash("secret-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn validity_requires_active_and_unexpired() {
        let now = Utc::now();
        let cred = Credential {
            key: "k".into(),
            expires_at: now + chrono::Duration::hours(1),
            source: "admin".into(),
            created_at: now,
            updated_at: now,
            active: true,
        };
        assert!(cred.is_valid_at(now));
        assert!(!cred.is_valid_at(now + chrono::Duration::hours(2)));

        let inactive = Credential { active: false, ..cred };
        assert!(!inactive.is_valid_at(now));
    }
}
