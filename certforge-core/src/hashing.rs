//! Content digests for batch manifests
//!
//! Every archive entry records the SHA-256 of its bytes, and every batch a
//! fingerprint of the inputs that produced it. Two batches with the same
//! fingerprint produce byte-identical archives.

use serde::{Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

/// JSON text with object keys sorted at every depth and no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Canonical(&serde_json::to_value(value)?))
}

/// Serializes a JSON value with its object keys in byte order.
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| (key, Canonical(value)))
                .collect::<BTreeMap<_, _>>()
                .serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            scalar => scalar.serialize(serializer),
        }
    }
}

/// Fingerprint of a batch request: the template digest, the canonical
/// settings and the engine version, newline separated.
pub fn compute_request_hash(
    template_bytes: &[u8],
    settings: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(sha256_hex(template_bytes));
    hasher.update(b"\n");
    hasher.update(canonical_json(settings)?);
    hasher.update(b"\n");
    hasher.update(engine_version);
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}
