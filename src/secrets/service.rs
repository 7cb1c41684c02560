use crate::cryptor::{self, CryptorError};
use crate::db::{NewSecret, RepositoryError, SecretRepository};
use crate::passhash::{PassphraseError, PassphraseHasher};
use crate::secrets::clock::Clock;
use crate::secrets::error::{conceal, NotFoundCause, SecretError, SecretResult};
use crate::secrets::token::{MintedKey, PublicToken, SigningKey};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A lookup-key collision is retried once with fresh material.
const MAX_CREATE_ATTEMPTS: usize = 2;

/// Input bounds enforced before any storage access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SecretLimits {
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    #[serde(default = "default_max_ttl_hours")]
    pub max_ttl_hours: u32,
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

fn default_max_ttl_hours() -> u32 {
    30 * 24
}

impl Default for SecretLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
            max_ttl_hours: default_max_ttl_hours(),
        }
    }
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSecret {
    pub token: String,
    /// Hint for client UIs only
    pub passphrase_required: bool,
}

/// Decrypted message of a consumed secret
#[derive(Clone)]
pub struct RevealedSecret {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealedSecret")
            .field("message", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Create/retrieve orchestration over a shared repository.
///
/// Holds no per-secret state; clones share the repository and clock.
#[derive(Clone)]
pub struct SecretService {
    repo: Arc<dyn SecretRepository>,
    clock: Arc<dyn Clock>,
    hasher: PassphraseHasher,
    limits: SecretLimits,
}

impl SecretService {
    pub fn new(
        repo: Arc<dyn SecretRepository>,
        clock: Arc<dyn Clock>,
        hasher: PassphraseHasher,
    ) -> Self {
        Self {
            repo,
            clock,
            hasher,
            limits: SecretLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SecretLimits) -> Self {
        self.limits = limits;
        self
    }

    fn validate(&self, message: &str, ttl_hours: u32) -> SecretResult<()> {
        if message.is_empty() {
            return Err(SecretError::invalid_request("message must not be empty"));
        }
        if message.len() > self.limits.max_message_bytes {
            return Err(SecretError::invalid_request(format!(
                "message exceeds {} bytes",
                self.limits.max_message_bytes
            )));
        }
        if ttl_hours > self.limits.max_ttl_hours {
            return Err(SecretError::invalid_request(format!(
                "ttl exceeds {} hours",
                self.limits.max_ttl_hours
            )));
        }
        Ok(())
    }

    /// Encrypt and store `message`, returning the one-time token.
    ///
    /// `ttl_hours == 0` means the secret never expires. An empty passphrase
    /// means no passphrase gate.
    pub async fn create(
        &self,
        message: &str,
        ttl_hours: u32,
        passphrase: Option<&str>,
    ) -> SecretResult<CreatedSecret> {
        self.validate(message, ttl_hours)?;

        let passphrase_hash = match passphrase.filter(|p| !p.is_empty()) {
            Some(passphrase) => Some(self.hash_passphrase(passphrase.to_string()).await?),
            None => None,
        };
        let passphrase_required = passphrase_hash.is_some();

        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(Duration::hours(i64::from(ttl_hours)))
            .ok_or_else(|| SecretError::invalid_request("ttl out of range"))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let minted = MintedKey::generate();

            let ciphertext = cryptor::encrypt(message.as_bytes(), minted.signing_key.as_bytes())
                .map_err(|e| SecretError::internal(format!("encrypt: {e}")))?;

            let new_secret = NewSecret {
                created_at,
                expires_at,
                lookup_key: minted.token.access_part().to_string(),
                key_remainder: minted.remainder.clone(),
                passphrase_hash: passphrase_hash.clone(),
                ciphertext,
            };

            match self.repo.insert(new_secret).await {
                Ok(_) => {
                    info!(
                        lookup = minted.token.log_prefix(),
                        ttl_hours, passphrase_required, "Secret created"
                    );
                    return Ok(CreatedSecret {
                        token: minted.token.encode(),
                        passphrase_required,
                    });
                }
                Err(RepositoryError::Conflict) if attempt < MAX_CREATE_ATTEMPTS => {
                    warn!(attempt, "Lookup key collision, retrying with fresh material");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Decrypt and destroy the secret behind `token`.
    ///
    /// Succeeds at most once per token. The record is deleted only after a
    /// successful decrypt, and the message is returned only if this call's
    /// delete removed the row.
    pub async fn retrieve(
        &self,
        token: &str,
        passphrase: Option<&str>,
    ) -> SecretResult<RevealedSecret> {
        let token = PublicToken::parse(token)?;
        let lookup = token.log_prefix();

        let Some(record) = self.repo.find(token.access_part()).await? else {
            return Err(conceal(NotFoundCause::Absent, lookup));
        };

        if record.is_expired(self.clock.now()) {
            self.repo.fetch_and_delete(&record.lookup_key).await?;
            info!(lookup, "Expired secret purged");
            return Err(conceal(NotFoundCause::Expired, lookup));
        }

        if let Some(hash) = record.passphrase_hash.clone() {
            let Some(supplied) = passphrase.filter(|p| !p.is_empty()) else {
                return Err(conceal(NotFoundCause::PassphraseMissing, lookup));
            };

            match self.verify_passphrase(supplied.to_string(), hash).await {
                Ok(()) => {}
                Err(PassphraseError::WrongPassphrase) => {
                    return Err(conceal(NotFoundCause::WrongPassphrase, lookup));
                }
                Err(e) => {
                    error!(lookup, error = %e, "Stored passphrase hash rejected");
                    return Err(SecretError::internal("passphrase verification failed"));
                }
            }
        }

        let key = SigningKey::join(&token, &record.key_remainder);
        let plaintext = cryptor::decrypt(&record.ciphertext, key.as_bytes()).map_err(|e| {
            error!(lookup, error = %e, "Stored secret failed to decrypt");
            SecretError::Integrity(e)
        })?;
        let message = String::from_utf8(plaintext).map_err(|_| {
            error!(lookup, "Decrypted secret is not valid UTF-8");
            SecretError::Integrity(CryptorError::MalformedEncoding)
        })?;

        match self.repo.remove(record.id, &record.lookup_key).await {
            Ok(true) => {
                info!(lookup, "Secret retrieved and destroyed");
                Ok(RevealedSecret {
                    message,
                    created_at: record.created_at,
                })
            }
            Ok(false) => Err(conceal(NotFoundCause::Consumed, lookup)),
            Err(e) => {
                error!(lookup, error = %e, "Failed to delete retrieved secret");
                Err(SecretError::ConsumeFailed(e))
            }
        }
    }

    async fn hash_passphrase(&self, passphrase: String) -> SecretResult<String> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&passphrase))
            .await
            .map_err(|e| SecretError::internal(format!("hash task: {e}")))?
            .map_err(|e| SecretError::internal(e.to_string()))
    }

    async fn verify_passphrase(&self, passphrase: String, hash: String) -> Result<(), PassphraseError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&passphrase, &hash))
            .await
            .map_err(|e| PassphraseError::Hashing(format!("verify task: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySecretRepository;
    use crate::passhash::Argon2Options;
    use crate::secrets::clock::ManualClock;

    fn service() -> (SecretService, Arc<MemorySecretRepository>, ManualClock) {
        let repo = Arc::new(MemorySecretRepository::new());
        let clock = ManualClock::default();
        let hasher = PassphraseHasher::new(Argon2Options {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        });
        let service = SecretService::new(repo.clone(), Arc::new(clock.clone()), hasher);
        (service, repo, clock)
    }

    #[tokio::test]
    async fn test_hello_scenario() {
        let (service, repo, _) = service();

        let created = service.create("hello", 0, Some("")).await.unwrap();
        assert!(!created.passphrase_required);
        assert_eq!(repo.len(), 1);

        let revealed = service.retrieve(&created.token, Some("")).await.unwrap();
        assert_eq!(revealed.message, "hello");
        assert!(repo.is_empty());

        let again = service.retrieve(&created.token, Some("")).await;
        assert!(matches!(again, Err(SecretError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_validates_input_before_storage() {
        let (service, repo, _) = service();
        let service = service.with_limits(SecretLimits {
            max_message_bytes: 8,
            max_ttl_hours: 24,
        });

        for (message, ttl) in [("", 0), ("123456789", 0), ("ok", 25)] {
            let result = service.create(message, ttl, None).await;
            assert!(matches!(result, Err(SecretError::InvalidRequest(_))));
        }
        assert!(repo.is_empty());

        assert!(service.create("12345678", 24, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_created_at_is_returned() {
        let (service, _, clock) = service();
        let created_at = clock.now();

        let created = service.create("m", 1, None).await.unwrap();
        clock.advance(Duration::minutes(5));
        let revealed = service.retrieve(&created.token, None).await.unwrap();
        assert_eq!(revealed.created_at, created_at);
    }

    #[tokio::test]
    async fn test_stored_record_holds_no_plaintext_or_exposed_part() {
        let (service, repo, _) = service();
        let created = service.create("top secret words", 0, None).await.unwrap();
        let token = PublicToken::parse(&created.token).unwrap();

        let record = repo.find(token.access_part()).await.unwrap().unwrap();
        assert!(!record.ciphertext.contains("top secret"));
        assert_eq!(record.key_remainder.expose().len(), 10);
        assert!(record.expires_at <= record.created_at);
    }

    #[tokio::test]
    async fn test_invalid_token_touches_no_storage() {
        let (service, repo, _) = service();
        service.create("kept", 0, None).await.unwrap();

        let result = service.retrieve("not-a-token!", None).await;
        assert!(matches!(result, Err(SecretError::InvalidToken)));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_keeps_record() {
        let (service, repo, _) = service();
        let created = service.create("gated", 0, Some("open sesame")).await.unwrap();
        assert!(created.passphrase_required);

        let wrong = service.retrieve(&created.token, Some("close sesame")).await;
        assert!(matches!(wrong, Err(SecretError::NotFound)));
        let missing = service.retrieve(&created.token, None).await;
        assert!(matches!(missing, Err(SecretError::NotFound)));
        assert_eq!(repo.len(), 1);

        let revealed = service
            .retrieve(&created.token, Some("open sesame"))
            .await
            .unwrap();
        assert_eq!(revealed.message, "gated");
    }

    #[tokio::test]
    async fn test_expired_secret_is_purged() {
        let (service, repo, clock) = service();
        let created = service.create("short lived", 1, None).await.unwrap();

        clock.advance(Duration::hours(1) + Duration::seconds(1));
        let result = service.retrieve(&created.token, None).await;
        assert!(matches!(result, Err(SecretError::NotFound)));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_not_yet_expired_secret_is_readable() {
        let (service, _, clock) = service();
        let created = service.create("still here", 1, None).await.unwrap();

        clock.advance(Duration::minutes(59));
        let revealed = service.retrieve(&created.token, None).await.unwrap();
        assert_eq!(revealed.message, "still here");
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let (service, _, clock) = service();
        let created = service.create("forever", 0, None).await.unwrap();

        clock.advance(Duration::days(3650));
        let revealed = service.retrieve(&created.token, None).await.unwrap();
        assert_eq!(revealed.message, "forever");
    }
}
