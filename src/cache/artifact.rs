use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::canonical::hash_value;
use crate::cache::fingerprint::Fingerprint;

/// The materialized output of one step for one unit.
///
/// Immutable once written. `content_hash` covers the canonical payload
/// and is revalidated on every cache read, so a torn or corrupted entry
/// is detected instead of served. The recorded `step` and `unit` identity
/// let consumers assert they received what they asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub fingerprint: String,
    pub step: String,
    pub unit: String,
    pub payload: Value,
    pub content_hash: String,
}

impl Artifact {
    pub fn new(
        fingerprint: &Fingerprint,
        step: impl Into<String>,
        unit: impl Into<String>,
        payload: Value,
    ) -> Self {
        let content_hash = hash_value(&payload);
        Self {
            fingerprint: fingerprint.as_hex().to_string(),
            step: step.into(),
            unit: unit.into(),
            payload,
            content_hash,
        }
    }

    /// Whether the stored content hash still matches the payload.
    pub fn verify(&self) -> bool {
        hash_value(&self.payload) == self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint::step_fingerprint;
    use serde_json::json;

    #[test]
    fn verify_detects_payload_tampering() {
        let fp = step_fingerprint("filter", "sub-01", &Value::Null, &Value::Null, &[]);
        let mut artifact = Artifact::new(&fp, "filter", "sub-01", json!({"ok": true}));
        assert!(artifact.verify());

        artifact.payload = json!({"ok": false});
        assert!(!artifact.verify());
    }
}
