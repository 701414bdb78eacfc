use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::canonical::hash_value;
use crate::config::consts::ENGINE_VERSION;

/// Deterministic identity of one step invocation.
///
/// A fingerprint is a pure function of its inputs: no wall clock, no
/// randomness. Two invocations with identical step, unit, configuration
/// slice, options, and input digests always collide; any difference in
/// any of those, including the *order* of input digests, produces a new
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of one step invocation.
///
/// `parameters` is the step's allow-listed configuration slice: only the
/// fields the step actually reads, so unrelated configuration edits leave
/// the fingerprint untouched. `options` is the opaque passthrough payload
/// forwarded verbatim to the transform; it is hashed verbatim too.
/// `input_digests` are ordered: declaring the same inputs in a different
/// order is a behavior-affecting change. `unit_label` is the step's
/// *scoped* identity label, so subject-scoped steps collide across that
/// subject's units and are computed once.
pub fn step_fingerprint(
    step_id: &str,
    unit_label: &str,
    parameters: &Value,
    options: &Value,
    input_digests: &[Value],
) -> Fingerprint {
    let material = json!({
        "engine_version": ENGINE_VERSION,
        "step": step_id,
        "unit": unit_label,
        "parameters": parameters,
        "options": options,
        "inputs": input_digests,
    });
    Fingerprint(hash_value(&material))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UNIT: &str = "sub-01_ses-a_run-01";

    #[test]
    fn identical_inputs_yield_identical_fingerprints() {
        let a = step_fingerprint("filter", UNIT, &json!({"l_freq": 0.1}), &Value::Null, &[]);
        let b = step_fingerprint("filter", UNIT, &json!({"l_freq": 0.1}), &Value::Null, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn parameter_change_changes_fingerprint() {
        let a = step_fingerprint("filter", UNIT, &json!({"l_freq": 0.1}), &Value::Null, &[]);
        let b = step_fingerprint("filter", UNIT, &json!({"l_freq": 1.0}), &Value::Null, &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn passthrough_options_enter_the_hash_verbatim() {
        let a = step_fingerprint("filter", UNIT, &Value::Null, &json!({"picks": "meg"}), &[]);
        let b = step_fingerprint("filter", UNIT, &Value::Null, &json!({"picks": "eeg"}), &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn input_order_is_significant() {
        let one = json!({"artifact": "aaa"});
        let two = json!({"artifact": "bbb"});
        let a = step_fingerprint(
            "average",
            UNIT,
            &Value::Null,
            &Value::Null,
            &[one.clone(), two.clone()],
        );
        let b = step_fingerprint("average", UNIT, &Value::Null, &Value::Null, &[two, one]);
        assert_ne!(a, b);
    }

    #[test]
    fn distinct_units_yield_distinct_fingerprints() {
        let a = step_fingerprint("filter", "sub-01_ses-a", &Value::Null, &Value::Null, &[]);
        let b = step_fingerprint("filter", "sub-01_ses-b", &Value::Null, &Value::Null, &[]);
        assert_ne!(a, b);
    }
}
