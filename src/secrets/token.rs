//! Retrieval tokens and the split signing key.

use crate::cryptor::{Encoder, KEY_SIZE};
use crate::secrets::error::{SecretError, SecretResult};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the public lookup key
pub const ACCESS_PART_LEN: usize = 8;
/// Length of the full signing material (the cipher key)
pub const SIGNING_MATERIAL_LEN: usize = KEY_SIZE;
/// How much of the signing material travels in the token
pub const EXPOSED_SIGNING_LEN: usize = 6;

const SEPARATOR: char = '$';

fn random_alphanumeric(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn is_part(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// The caller-held capability: lookup key plus the exposed signing prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicToken {
    access_part: String,
    exposed_signing_part: String,
}

impl PublicToken {
    pub fn access_part(&self) -> &str {
        &self.access_part
    }

    /// Non-secret prefix of the lookup key for log lines
    pub fn log_prefix(&self) -> &str {
        &self.access_part[..3.min(self.access_part.len())]
    }

    pub fn encode(&self) -> String {
        Encoder::UrlSafe.encode(format!(
            "{}{}{}",
            self.access_part, SEPARATOR, self.exposed_signing_part
        ))
    }

    /// Parse a token string. Any malformation is [`SecretError::InvalidToken`].
    pub fn parse(token: &str) -> SecretResult<Self> {
        let decoded = Encoder::UrlSafe
            .decode(token.trim())
            .map_err(|_| SecretError::InvalidToken)?;
        let decoded = String::from_utf8(decoded).map_err(|_| SecretError::InvalidToken)?;

        let mut parts = decoded.split(SEPARATOR);
        let (Some(access), Some(exposed), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SecretError::InvalidToken);
        };

        if !is_part(access, ACCESS_PART_LEN) || !is_part(exposed, EXPOSED_SIGNING_LEN) {
            return Err(SecretError::InvalidToken);
        }

        Ok(Self {
            access_part: access.to_string(),
            exposed_signing_part: exposed.to_string(),
        })
    }
}

impl fmt::Debug for PublicToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicToken")
            .field("access_part", &self.access_part)
            .field("exposed_signing_part", &"<redacted>")
            .finish()
    }
}

/// Server-held tail of the signing material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ServerRemainder(String);

impl ServerRemainder {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for ServerRemainder {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ServerRemainder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerRemainder(<redacted>)")
    }
}

/// Full cipher key: exposed part followed by the remainder.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SigningKey(String);

impl SigningKey {
    pub(crate) fn join(token: &PublicToken, remainder: &ServerRemainder) -> Self {
        let mut key = String::with_capacity(SIGNING_MATERIAL_LEN);
        key.push_str(&token.exposed_signing_part);
        key.push_str(remainder.expose());
        Self(key)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Fresh random material for one secret.
pub(crate) struct MintedKey {
    pub token: PublicToken,
    pub remainder: ServerRemainder,
    pub signing_key: SigningKey,
}

impl MintedKey {
    pub(crate) fn generate() -> Self {
        let access_part = random_alphanumeric(ACCESS_PART_LEN);
        let signing = SigningKey(random_alphanumeric(SIGNING_MATERIAL_LEN));

        let (exposed, rest) = signing.0.split_at(EXPOSED_SIGNING_LEN);
        let token = PublicToken {
            access_part,
            exposed_signing_part: exposed.to_string(),
        };
        let remainder = ServerRemainder(rest.to_string());

        Self {
            token,
            remainder,
            signing_key: signing,
        }
    }
}
