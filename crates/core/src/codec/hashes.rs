//! Digest helpers, request signing and the stable title-id hash.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded MD5 digest.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Raw HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Sign an upstream request the way the platform gateways expect it.
///
/// The canonical string is the uppercased method, one `key:value` line per
/// signed header (in the order given), and the path with the query appended
/// sorted by key, all joined by `\n`. The HMAC-SHA256 over it is returned
/// base64-encoded.
pub fn sign_request(
    secret: &[u8],
    method: &str,
    path: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
) -> String {
    let mut canonical = String::new();
    canonical.push_str(&method.to_uppercase());
    for (key, value) in headers {
        canonical.push('\n');
        canonical.push_str(key);
        canonical.push(':');
        canonical.push_str(value);
    }
    canonical.push('\n');
    canonical.push_str(path);
    if !query.is_empty() {
        let mut sorted: Vec<_> = query.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        canonical.push('?');
        canonical.push_str(&joined);
    }
    super::b64_encode(&hmac_sha256(secret, canonical.as_bytes()))
}

/// Derive a stable numeric title id from a display name.
///
/// djb2-xor over UTF-16 code units, reduced to the 10000..=9999999 range so
/// ids never collide with the episode counter space.
pub fn title_id_for(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for unit in name.encode_utf16() {
        hash = hash.wrapping_mul(33) ^ unit as u32;
    }
    let mut id = hash % 9_999_999;
    if id < 10_000 {
        id += 10_000;
    }
    id
}
