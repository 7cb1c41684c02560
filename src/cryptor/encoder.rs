//! Reversible bytes <-> text transform.

use base64::{
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
    Engine,
};

use super::{CryptorError, CryptorResult};

/// Base64 alphabet used for a given piece of framing.
///
/// Tokens travel in URL paths and use the URL-safe alphabet; stored
/// ciphertext uses the standard one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Standard,
    UrlSafe,
}

impl Encoder {
    pub fn encode(&self, data: impl AsRef<[u8]>) -> String {
        match self {
            Self::Standard => STANDARD_NO_PAD.encode(data),
            Self::UrlSafe => URL_SAFE_NO_PAD.encode(data),
        }
    }

    /// Decode `text`, rejecting foreign characters, padding and impossible lengths.
    pub fn decode(&self, text: impl AsRef<[u8]>) -> CryptorResult<Vec<u8>> {
        let decoded = match self {
            Self::Standard => STANDARD_NO_PAD.decode(text),
            Self::UrlSafe => URL_SAFE_NO_PAD.decode(text),
        };
        decoded.map_err(|_| CryptorError::MalformedEncoding)
    }
}
