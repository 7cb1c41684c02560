//! Byte-level building blocks for stored secrets.
//!
//! Uses:
//! - Base64 (standard and URL-safe alphabets, no padding) for framing
//! - PKCS#7 block padding
//! - AES-256-CBC with an HMAC-SHA256 tag (encrypt-then-MAC)

pub mod cipher;
pub mod encoder;
pub mod padding;

use thiserror::Error;

pub use cipher::{decrypt, encrypt, KEY_SIZE};
pub use encoder::Encoder;
pub use padding::{pad, unpad};

/// Errors raised by the encoder, padding scheme and cipher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptorError {
    #[error("Malformed encoding")]
    MalformedEncoding,

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Invalid data size")]
    InvalidDataSize,

    #[error("Invalid padding")]
    InvalidPadding,

    #[error("Invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("Integrity check failed - corrupted data or wrong key")]
    Authentication,
}

/// Result type for cryptor operations
pub type CryptorResult<T> = Result<T, CryptorError>;
