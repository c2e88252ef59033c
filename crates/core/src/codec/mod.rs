//! Binary and cryptographic primitives used by source adapters and the
//! normalization pipeline: digests, request signing, AES-ECB payload
//! decryption, base64 and a length-delimited binary record decoder.

mod aes_ecb;
mod hashes;
mod varint;

pub use aes_ecb::{aes128_ecb_decrypt, CryptoError};
pub use hashes::{hmac_sha256, md5_hex, sha256_hex, sign_request, title_id_for};
pub use varint::{decode_comment_segment, read_varint, DanmakuRecord, DecodeError};

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError as Base64Error, Engine};

/// Encode bytes as standard base64.
pub fn b64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64 into bytes.
pub fn b64_decode(data: &str) -> Result<Vec<u8>, Base64Error> {
    STANDARD.decode(data)
}
