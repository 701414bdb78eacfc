use async_trait::async_trait;
use serde_json::{json, Value};

use crate::traits::dataset::RawInput;
use crate::traits::transform::{Transform, TransformInput, TransformRequest, TransformResponse};

/// Band-pass filtering stage.
///
/// When the cHPI channel set was resolved, the filter additionally
/// suppresses the head-position-indicator frequencies; when the plan
/// omitted it, the step runs on the main channel set alone.
pub struct BandpassTransform;

impl BandpassTransform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transform for BandpassTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        let recording = req.inputs.iter().find_map(|input| match input {
            TransformInput::Raw {
                category: RawInput::Recording,
                reference,
            } => Some(reference.clone()),
            _ => None,
        });
        let Some(recording) = recording else {
            return TransformResponse::error("bandpass requires a recording input");
        };

        let chpi_suppressed = req.inputs.iter().any(|input| {
            matches!(
                input,
                TransformInput::Raw {
                    category: RawInput::Chpi,
                    ..
                }
            )
        });

        TransformResponse::payload(json!({
            "kind": "filtered",
            "source": recording,
            "l_freq": req.parameters.get("l_freq").cloned().unwrap_or(Value::Null),
            "h_freq": req.parameters.get("h_freq").cloned().unwrap_or(Value::Null),
            "chpi_suppressed": chpi_suppressed,
            "picks": req.options.get("picks").cloned().unwrap_or(Value::Null),
        }))
    }

    fn name(&self) -> &'static str {
        "bandpass"
    }
}
