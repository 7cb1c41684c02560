//! Passphrase gate: salted Argon2id hashes in PHC string form.
//!
//! Encoded hashes look like `$argon2id$v=19$m=65536,t=3,p=2$<salt>$<key>`.
//! Verification only accepts hashes produced with the configured cost
//! parameters.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use serde::Deserialize;
use thiserror::Error;

/// Derived key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// Passphrase hashing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PassphraseError {
    #[error("Unsupported passphrase hash")]
    UnsupportedHash,

    #[error("Wrong passphrase")]
    WrongPassphrase,

    #[error("Passphrase hashing failed: {0}")]
    Hashing(String),
}

/// Result type for passphrase operations
pub type PassphraseResult<T> = Result<T, PassphraseError>;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Argon2Options {
    /// Memory cost in KiB
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    64 * 1024
}

fn default_iterations() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    2
}

impl Default for Argon2Options {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Hashes and verifies passphrases with a fixed set of Argon2id parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassphraseHasher {
    options: Argon2Options,
}

impl PassphraseHasher {
    pub fn new(options: Argon2Options) -> Self {
        Self { options }
    }

    fn argon2(&self) -> PassphraseResult<Argon2<'static>> {
        let params = Params::new(
            self.options.memory_kib,
            self.options.iterations,
            self.options.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| PassphraseError::Hashing(e.to_string()))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `passphrase` under a fresh random salt.
    pub fn hash(&self, passphrase: &str) -> PassphraseResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(passphrase.as_bytes(), &salt)
            .map_err(|e| PassphraseError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check `passphrase` against an encoded hash.
    ///
    /// The derived keys are compared in constant time. A mismatch is always
    /// reported as [`PassphraseError::WrongPassphrase`].
    pub fn verify(&self, passphrase: &str, encoded: &str) -> PassphraseResult<()> {
        let parsed = PasswordHash::new(encoded).map_err(|_| PassphraseError::UnsupportedHash)?;

        if parsed.algorithm != Algorithm::Argon2id.ident()
            || parsed.version != Some(Version::V0x13 as u32)
        {
            return Err(PassphraseError::UnsupportedHash);
        }

        let params = Params::try_from(&parsed).map_err(|_| PassphraseError::UnsupportedHash)?;
        if params.m_cost() != self.options.memory_kib
            || params.t_cost() != self.options.iterations
            || params.p_cost() != self.options.parallelism
        {
            return Err(PassphraseError::UnsupportedHash);
        }

        match parsed.hash {
            Some(output) if output.len() == KEY_LENGTH => {}
            _ => return Err(PassphraseError::UnsupportedHash),
        }

        self.argon2()?
            .verify_password(passphrase.as_bytes(), &parsed)
            .map_err(|e| match e {
                password_hash::Error::Password => PassphraseError::WrongPassphrase,
                _ => PassphraseError::UnsupportedHash,
            })
    }
}
