use async_trait::async_trait;
use serde_json::{json, Value};

use crate::traits::dataset::RawInput;
use crate::traits::transform::{Transform, TransformInput, TransformRequest, TransformResponse};

/// Maxwell filtering / movement compensation stage.
///
/// Consumes the filtered recording plus the site calibration and
/// cross-talk resources; either may arrive as the built-in default when
/// the dataset lacks the file.
pub struct MaxwellTransform;

impl MaxwellTransform {
    pub fn new() -> Self {
        Self
    }
}

fn resource(inputs: &[TransformInput], category: RawInput) -> Value {
    inputs
        .iter()
        .find_map(|input| match input {
            TransformInput::Raw {
                category: found,
                reference,
            } if *found == category => Some(json!(reference)),
            TransformInput::Default {
                category: found, ..
            } if *found == category => Some(json!("builtin-default")),
            _ => None,
        })
        .unwrap_or(Value::Null)
}

#[async_trait]
impl Transform for MaxwellTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        let upstream: Vec<String> = req
            .inputs
            .iter()
            .filter_map(|input| match input {
                TransformInput::Artifact(artifact) => Some(artifact.fingerprint.clone()),
                _ => None,
            })
            .collect();

        TransformResponse::payload(json!({
            "kind": "maxwell_filtered",
            "inputs": upstream,
            "calibration": resource(&req.inputs, RawInput::Calibration),
            "cross_talk": resource(&req.inputs, RawInput::CrossTalk),
            "st_duration": req.options.get("st_duration").cloned().unwrap_or(Value::Null),
        }))
    }

    fn name(&self) -> &'static str {
        "maxwell"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StepMode;
    use crate::index::Unit;
    use crate::traits::transform::TransformOutcome;

    #[tokio::test]
    async fn substituted_calibration_is_visible_in_the_payload() {
        let req = TransformRequest {
            unit: Unit {
                subject: "01".into(),
                session: None,
                run: Some("01".into()),
                task: None,
            },
            inputs: vec![TransformInput::Default {
                category: RawInput::Calibration,
                payload: RawInput::Calibration.builtin_default(),
            }],
            parameters: Value::Null,
            options: Value::Null,
            mode: StepMode::Full,
        };

        match MaxwellTransform::new().apply(req).await.outcome {
            TransformOutcome::Payload(payload) => {
                assert_eq!(payload["calibration"], json!("builtin-default"));
                assert_eq!(payload["cross_talk"], Value::Null);
            }
            TransformOutcome::Error { message } => panic!("unexpected error: {}", message),
        }
    }
}
