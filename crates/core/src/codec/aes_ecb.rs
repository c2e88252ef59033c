//! AES-128-ECB payload decryption with PKCS7 unpadding.
//!
//! Some upstream platforms ship comment locators encrypted with a static
//! AES key in ECB mode. ECB is their choice, not ours; the block loop below
//! only ever decrypts.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes128;
use thiserror::Error;

const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("AES-128 key must be 16 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("ciphertext length {0} is not a positive multiple of 16")]
    InvalidCiphertextLength(usize),

    #[error("invalid PKCS7 padding")]
    InvalidPadding,
}

/// Decrypt an AES-128-ECB ciphertext and strip PKCS7 padding.
pub fn aes128_ecb_decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != BLOCK_SIZE {
        return Err(CryptoError::InvalidKeyLength(key.len()));
    }
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(ciphertext.len()));
    }

    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut plaintext = ciphertext.to_vec();
    for block in plaintext.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    strip_pkcs7(plaintext)
}

fn strip_pkcs7(mut data: Vec<u8>) -> Result<Vec<u8>, CryptoError> {
    let pad = match data.last() {
        Some(&b) => b as usize,
        None => return Err(CryptoError::InvalidPadding),
    };
    if pad == 0 || pad > BLOCK_SIZE || pad > data.len() {
        return Err(CryptoError::InvalidPadding);
    }
    if !data[data.len() - pad..].iter().all(|&b| b as usize == pad) {
        return Err(CryptoError::InvalidPadding);
    }
    data.truncate(data.len() - pad);
    Ok(data)
}
