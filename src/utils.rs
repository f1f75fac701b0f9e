//! Utility functions for hashing and serialization

use serde::Serialize;

// serialize to compact JSON then hash the bytes. Object keys come out sorted,
// so equal values always give equal bytes.
pub fn digest_json<T: Serialize>(value: &T) -> anyhow::Result<(String, Vec<u8>)> {
    let bytes = serde_json::to_vec(&serde_json::to_value(value)?)?;
    let hash = sha256::digest(&bytes);

    Ok((hash, bytes))
}
