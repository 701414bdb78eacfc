use async_trait::async_trait;
use serde_json::json;

use crate::traits::transform::{Transform, TransformInput, TransformRequest, TransformResponse};

/// Multi-run averaging stage.
///
/// Input order is semantic here: averaging runs in a different order is a
/// different computation, which is why the engine fingerprints inputs as
/// an ordered list.
pub struct AverageTransform;

impl AverageTransform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transform for AverageTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        let order: Vec<String> = req
            .inputs
            .iter()
            .filter_map(|input| match input {
                TransformInput::Artifact(artifact) => Some(artifact.fingerprint.clone()),
                TransformInput::Raw { reference, .. } => Some(reference.clone()),
                _ => None,
            })
            .collect();

        if order.is_empty() {
            return TransformResponse::error("average requires at least one input");
        }

        TransformResponse::payload(json!({
            "kind": "evoked",
            "order": order,
            "n_inputs": order.len(),
        }))
    }

    fn name(&self) -> &'static str {
        "average"
    }
}
