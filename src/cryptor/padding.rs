//! PKCS#7 block alignment.

use super::{CryptorError, CryptorResult};

fn check_block_size(block_size: usize) -> CryptorResult<()> {
    if block_size <= 1 || block_size >= 256 {
        return Err(CryptorError::InvalidBlockSize(block_size));
    }
    Ok(())
}

/// Append `n` bytes of value `n` so the result is a multiple of `block_size`.
///
/// Block-aligned input grows by a full block, which keeps [`unpad`] unambiguous.
pub fn pad(data: &[u8], block_size: usize) -> CryptorResult<Vec<u8>> {
    check_block_size(block_size)?;

    let pad_len = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    Ok(padded)
}

/// Strip and validate PKCS#7 padding.
pub fn unpad(data: &[u8], block_size: usize) -> CryptorResult<&[u8]> {
    check_block_size(block_size)?;

    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CryptorError::InvalidDataSize);
    }

    let pad_len = data[data.len() - 1] as usize;
    if pad_len == 0 || pad_len > block_size {
        return Err(CryptorError::InvalidPadding);
    }

    let (body, tail) = data.split_at(data.len() - pad_len);
    if tail.iter().any(|&b| b as usize != pad_len) {
        return Err(CryptorError::InvalidPadding);
    }

    Ok(body)
}
