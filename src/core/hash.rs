use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::error::CaseError;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// True when `value` is a 32-byte digest in hex (either case).
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && hex::decode(value).is_ok()
}

pub fn digest_json<T: Serialize>(value: &T) -> Result<String, CaseError> {
    let json = serde_json::to_string(value)?;
    Ok(sha256_hex(json.as_bytes()))
}
