use async_trait::async_trait;
use serde_json::{json, Value};

use crate::traits::transform::{Transform, TransformInput, TransformRequest, TransformResponse};

/// Epoching stage: cuts continuous input into trial windows.
pub struct EpochsTransform;

impl EpochsTransform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transform for EpochsTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        let upstream: Vec<String> = req
            .inputs
            .iter()
            .filter_map(|input| match input {
                TransformInput::Artifact(artifact) => Some(artifact.fingerprint.clone()),
                _ => None,
            })
            .collect();

        if upstream.is_empty() {
            return TransformResponse::error("epochs requires at least one upstream artifact");
        }

        TransformResponse::payload(json!({
            "kind": "epochs",
            "inputs": upstream,
            "tmin": req.parameters.get("epochs_tmin").cloned().unwrap_or(Value::Null),
            "tmax": req.parameters.get("epochs_tmax").cloned().unwrap_or(Value::Null),
            "decim": req.options.get("decim").cloned().unwrap_or(Value::Null),
        }))
    }

    fn name(&self) -> &'static str {
        "epochs"
    }
}
