//! In-process secret storage.
//!
//! Nothing survives a restart. Used by tests and by deployments that set
//! `database.url = "memory"`.

use crate::db::models::{NewSecret, SecretRecord};
use crate::db::queries::SecretRepository;
use crate::db::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// DashMap-backed secret repository keyed by lookup key
#[derive(Debug, Default)]
pub struct MemorySecretRepository {
    secrets: DashMap<String, SecretRecord>,
    next_id: AtomicI64,
}

impl MemorySecretRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current number of stored secrets
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretRepository for MemorySecretRepository {
    async fn insert(&self, secret: NewSecret) -> RepositoryResult<i64> {
        match self.secrets.entry(secret.lookup_key.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                slot.insert(secret.into_record(id));
                Ok(id)
            }
        }
    }

    async fn find(&self, lookup_key: &str) -> RepositoryResult<Option<SecretRecord>> {
        Ok(self.secrets.get(lookup_key).map(|r| r.value().clone()))
    }

    async fn remove(&self, id: i64, lookup_key: &str) -> RepositoryResult<bool> {
        Ok(self
            .secrets
            .remove_if(lookup_key, |_, record| record.id == id)
            .is_some())
    }

    async fn fetch_and_delete(&self, lookup_key: &str) -> RepositoryResult<Option<SecretRecord>> {
        Ok(self.secrets.remove(lookup_key).map(|(_, record)| record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::ServerRemainder;
    use chrono::Utc;
    use std::sync::Arc;

    fn new_secret(lookup_key: &str) -> NewSecret {
        let now = Utc::now();
        NewSecret {
            created_at: now,
            expires_at: now,
            lookup_key: lookup_key.to_string(),
            key_remainder: ServerRemainder::from("remainder1".to_string()),
            passphrase_hash: None,
            ciphertext: String::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = MemorySecretRepository::new();
        let a = repo.insert(new_secret("a")).await.unwrap();
        let b = repo.insert(new_secret("b")).await.unwrap();
        assert!(b > a);
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_on_duplicate() {
        let repo = MemorySecretRepository::new();
        repo.insert(new_secret("a")).await.unwrap();
        assert!(matches!(
            repo.insert(new_secret("a")).await,
            Err(RepositoryError::Conflict)
        ));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_guarded_by_id() {
        let repo = MemorySecretRepository::new();
        let id = repo.insert(new_secret("a")).await.unwrap();

        assert!(!repo.remove(id + 100, "a").await.unwrap());
        assert!(repo.remove(id, "a").await.unwrap());
        assert!(!repo.remove(id, "a").await.unwrap());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_removes_have_one_winner() {
        let repo = Arc::new(MemorySecretRepository::new());
        let id = repo.insert(new_secret("race")).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.remove(id, "race").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_fetch_and_delete() {
        let repo = MemorySecretRepository::new();
        repo.insert(new_secret("a")).await.unwrap();

        assert!(repo.fetch_and_delete("a").await.unwrap().is_some());
        assert!(repo.fetch_and_delete("a").await.unwrap().is_none());
    }
}
