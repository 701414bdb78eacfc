//! Canonical JSON encoding and content hashing.
//!
//! Fingerprints must be identical across runs and platforms, so the JSON
//! fed to the hash function is serialized with sorted object keys and no
//! insignificant whitespace.

use std::collections::BTreeMap;

use serde_json::Value;

/// Serialize a JSON value with deterministic key ordering.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).expect("string serialization is infallible"),
        Value::Array(items) => {
            let encoded: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", encoded.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> = map
                .iter()
                .map(|(k, v)| (k, to_canonical_json(v)))
                .collect();
            let encoded: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).expect("string serialization is infallible"),
                        v
                    )
                })
                .collect();
            format!("{{{}}}", encoded.join(","))
        }
    }
}

/// Hash a JSON value's canonical encoding, returning a hex digest.
pub fn hash_value(value: &Value) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(to_canonical_json(value).as_bytes());
    hasher.finalize().to_hex().to_string()
}
