use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::secrets::ServerRemainder;

/// Stored secret, exactly as persisted.
///
/// `key_remainder` is the server-held half of the signing key; it never
/// leaves this process.
#[derive(Debug, Clone)]
pub struct SecretRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub lookup_key: String,
    pub key_remainder: ServerRemainder,
    /// `None` when no passphrase gate was set
    pub passphrase_hash: Option<String>,
    pub ciphertext: String,
}

impl SecretRecord {
    /// `expires_at <= created_at` encodes "never expires".
    pub fn has_expiry(&self) -> bool {
        self.expires_at > self.created_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.has_expiry() && now > self.expires_at
    }
}

/// Row layout of the `secrets` table
#[derive(FromRow)]
pub(crate) struct SecretRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub lookup_key: String,
    pub key_remainder: String,
    pub passphrase_hash: String,
    pub ciphertext: String,
}

impl From<SecretRow> for SecretRecord {
    fn from(row: SecretRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            lookup_key: row.lookup_key,
            key_remainder: ServerRemainder::from(row.key_remainder),
            passphrase_hash: Some(row.passphrase_hash).filter(|h| !h.is_empty()),
            ciphertext: row.ciphertext,
        }
    }
}

/// New secret insertion request
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub lookup_key: String,
    pub key_remainder: ServerRemainder,
    pub passphrase_hash: Option<String>,
    pub ciphertext: String,
}

impl NewSecret {
    pub fn into_record(self, id: i64) -> SecretRecord {
        SecretRecord {
            id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            lookup_key: self.lookup_key,
            key_remainder: self.key_remainder,
            passphrase_hash: self.passphrase_hash,
            ciphertext: self.ciphertext,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(ttl_hours: i64) -> SecretRecord {
        let created_at = Utc::now();
        SecretRecord {
            id: 1,
            created_at,
            expires_at: created_at + Duration::hours(ttl_hours),
            lookup_key: "AbCdEfGh".to_string(),
            key_remainder: ServerRemainder::from("0123456789".to_string()),
            passphrase_hash: None,
            ciphertext: String::new(),
        }
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let record = record(0);
        assert!(!record.has_expiry());
        assert!(!record.is_expired(record.created_at + Duration::days(3650)));
    }

    #[test]
    fn test_expiry_is_strictly_after_expires_at() {
        let record = record(1);
        assert!(!record.is_expired(record.expires_at));
        assert!(record.is_expired(record.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_row_empty_passphrase_means_no_gate() {
        let now = Utc::now();
        let row = SecretRow {
            id: 7,
            created_at: now,
            expires_at: now,
            lookup_key: "k".to_string(),
            key_remainder: "r".to_string(),
            passphrase_hash: String::new(),
            ciphertext: "c".to_string(),
        };

        let record = SecretRecord::from(row);
        assert_eq!(record.id, 7);
        assert!(record.passphrase_hash.is_none());
    }

    #[test]
    fn test_debug_never_shows_remainder() {
        let record = record(0);
        let debug = format!("{:?}", record);
        assert!(!debug.contains("0123456789"));
    }
}
