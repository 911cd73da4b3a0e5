//! Template canonicalization and content hashing.
//!
//! Change detection works on a canonical text form of the template: two
//! templates that are equal up to key ordering must hash identically, and
//! any semantic difference must produce a different digest.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a template as canonical JSON.
///
/// Object keys are sorted lexicographically at every nesting level,
/// including objects inside array elements; arrays keep their positional
/// order. Scalars use their natural JSON encoding.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let parts: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), v))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// SHA-256 over the canonical form, rendered as lowercase hex.
///
/// Pure function of the template; cheap enough to recompute on every
/// reconciliation run, so nothing is cached.
pub fn fingerprint(template: &Value) -> String {
    format!("{:x}", Sha256::digest(canonical_json(template).as_bytes()))
}
