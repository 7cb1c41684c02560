//! Symmetric encryption of secret bodies.
//!
//! Frame layout before encoding: `iv (16) || AES-256-CBC ciphertext || HMAC-SHA256 tag (32)`.
//! The caller supplies a 16-byte key; HKDF-SHA256 expands it into separate
//! encryption and MAC keys.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{pad, unpad, CryptorError, CryptorResult, Encoder};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Required length of the caller-supplied key, in bytes.
pub const KEY_SIZE: usize = 16;

const BLOCK_SIZE: usize = 16;
const TAG_SIZE: usize = 32;

const HKDF_SALT: &[u8] = b"secrets-keeper-v1";
const HKDF_INFO: &[u8] = b"secret-body-keys";

#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKeys {
    enc: [u8; 32],
    mac: [u8; 32],
}

impl DerivedKeys {
    fn derive(key: &[u8]) -> CryptorResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(CryptorError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: key.len(),
            });
        }

        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), key);
        let mut okm = [0u8; 64];
        hk.expand(HKDF_INFO, &mut okm)
            .map_err(|_| CryptorError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: key.len(),
            })?;

        let mut keys = Self {
            enc: [0u8; 32],
            mac: [0u8; 32],
        };
        keys.enc.copy_from_slice(&okm[..32]);
        keys.mac.copy_from_slice(&okm[32..]);
        okm.zeroize();
        Ok(keys)
    }

    fn mac(&self) -> CryptorResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.mac).map_err(|_| CryptorError::Authentication)
    }
}

/// Encrypt `plaintext` under `key` and return the encoded frame.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> CryptorResult<String> {
    let keys = DerivedKeys::derive(key)?;
    let padded = pad(plaintext, BLOCK_SIZE)?;

    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(&keys.enc, &iv)
        .map_err(|_| CryptorError::InvalidKeySize {
            expected: KEY_SIZE,
            actual: key.len(),
        })?
        .encrypt_padded_vec_mut::<NoPadding>(&padded);

    let mut frame = Vec::with_capacity(BLOCK_SIZE + ciphertext.len() + TAG_SIZE);
    frame.extend_from_slice(&iv);
    frame.extend_from_slice(&ciphertext);

    let mut mac = keys.mac()?;
    mac.update(&frame);
    frame.extend_from_slice(&mac.finalize().into_bytes());

    Ok(Encoder::Standard.encode(frame))
}

/// Decode, authenticate and decrypt a frame produced by [`encrypt`].
pub fn decrypt(encoded: &str, key: &[u8]) -> CryptorResult<Vec<u8>> {
    let keys = DerivedKeys::derive(key)?;
    let frame = Encoder::Standard.decode(encoded)?;

    if frame.len() < BLOCK_SIZE + TAG_SIZE {
        return Err(CryptorError::InvalidDataSize);
    }

    let (authenticated, tag) = frame.split_at(frame.len() - TAG_SIZE);
    let mut mac = keys.mac()?;
    mac.update(authenticated);
    mac.verify_slice(tag)
        .map_err(|_| CryptorError::Authentication)?;

    let (iv, body) = authenticated.split_at(BLOCK_SIZE);
    if body.is_empty() || body.len() % BLOCK_SIZE != 0 {
        return Err(CryptorError::InvalidDataSize);
    }

    let mut decrypted = Aes256CbcDec::new_from_slices(&keys.enc, iv)
        .map_err(|_| CryptorError::InvalidKeySize {
            expected: KEY_SIZE,
            actual: key.len(),
        })?
        .decrypt_padded_vec_mut::<NoPadding>(body)
        .map_err(|_| CryptorError::InvalidDataSize)?;

    let plaintext = unpad(&decrypted, BLOCK_SIZE).map(<[u8]>::to_vec);
    decrypted.zeroize();
    plaintext
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 16] = b"abcdefghijklmnop";

    #[test]
    fn test_round_trip() {
        let encoded = encrypt(b"hello, secret", KEY).unwrap();
        assert_eq!(decrypt(&encoded, KEY).unwrap(), b"hello, secret");
    }

    #[test]
    fn test_round_trip_empty_and_binary() {
        for plaintext in [&b""[..], &[0u8, 0, 0, 255][..], &[16u8; 16][..]] {
            let encoded = encrypt(plaintext, KEY).unwrap();
            assert_eq!(decrypt(&encoded, KEY).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_same_plaintext_different_frames() {
        let a = encrypt(b"same", KEY).unwrap();
        let b = encrypt(b"same", KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_key_size() {
        assert_eq!(
            encrypt(b"x", b"short"),
            Err(CryptorError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: 5
            })
        );
        let encoded = encrypt(b"x", KEY).unwrap();
        assert!(matches!(
            decrypt(&encoded, &[0u8; 32]),
            Err(CryptorError::InvalidKeySize { .. })
        ));
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let encoded = encrypt(b"secret", KEY).unwrap();
        assert_eq!(
            decrypt(&encoded, b"ABCDEFGHIJKLMNOP"),
            Err(CryptorError::Authentication)
        );
    }

    #[test]
    fn test_malformed_encoding() {
        assert_eq!(
            decrypt("not*base64", KEY),
            Err(CryptorError::MalformedEncoding)
        );
    }

    #[test]
    fn test_truncated_frame() {
        let short = Encoder::Standard.encode([0u8; 20]);
        assert_eq!(decrypt(&short, KEY), Err(CryptorError::InvalidDataSize));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let encoded = encrypt(b"attack at dawn", KEY).unwrap();
        let frame = Encoder::Standard.decode(&encoded).unwrap();

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                let result = decrypt(&Encoder::Standard.encode(&corrupted), KEY);
                assert_eq!(result, Err(CryptorError::Authentication));
            }
        }
    }
}
