use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::StepMode;
use crate::traits::dataset::{ChannelType, RawInput};
use crate::traits::transform::{Transform, TransformInput, TransformRequest, TransformResponse};

// Degrees of freedom per sensor type on a standard 306-channel system.
const MAG_DOF: usize = 102;
const GRAD_DOF: usize = 204;
const EEG_DOF: usize = 60;

fn dof(channel_type: ChannelType) -> usize {
    match channel_type {
        ChannelType::Mag => MAG_DOF,
        ChannelType::Grad => GRAD_DOF,
        ChannelType::Eeg => EEG_DOF,
    }
}

/// Noise covariance estimation stage.
///
/// The rank is recomputed from the channel types the plan resolved: a
/// narrowed plan (one sensor type instead of two) yields the degrees of
/// freedom of the available type alone rather than assuming both.
pub struct CovarianceTransform;

impl CovarianceTransform {
    pub fn new() -> Self {
        Self
    }
}

fn resolved_types(req: &TransformRequest) -> Vec<ChannelType> {
    if let StepMode::Narrowed { available } = &req.mode {
        return available.clone();
    }

    let reference = req.inputs.iter().find_map(|input| match input {
        TransformInput::Raw {
            category: RawInput::ChannelTypes,
            reference,
        } => Some(reference.as_str()),
        _ => None,
    });

    match reference {
        Some(reference) => reference
            .split('+')
            .filter_map(|name| match name {
                "mag" => Some(ChannelType::Mag),
                "grad" => Some(ChannelType::Grad),
                "eeg" => Some(ChannelType::Eeg),
                _ => None,
            })
            .collect(),
        None => vec![ChannelType::Mag, ChannelType::Grad],
    }
}

#[async_trait]
impl Transform for CovarianceTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        let types = resolved_types(&req);
        let rank: usize = types.iter().map(|t| dof(*t)).sum();

        let upstream: Vec<String> = req
            .inputs
            .iter()
            .filter_map(|input| match input {
                TransformInput::Artifact(artifact) => Some(artifact.fingerprint.clone()),
                TransformInput::Raw { reference, .. } => Some(reference.clone()),
                _ => None,
            })
            .collect();

        TransformResponse::payload(json!({
            "kind": "noise_cov",
            "inputs": upstream,
            "ch_types": types.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            "rank": rank,
            "method": req.parameters.get("cov_method").cloned().unwrap_or(Value::Null),
        }))
    }

    fn name(&self) -> &'static str {
        "covariance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Unit;
    use crate::traits::transform::TransformOutcome;

    fn request(mode: StepMode, inputs: Vec<TransformInput>) -> TransformRequest {
        TransformRequest {
            unit: Unit {
                subject: "01".into(),
                session: None,
                run: None,
                task: None,
            },
            inputs,
            parameters: Value::Null,
            options: Value::Null,
            mode,
        }
    }

    fn payload_of(response: TransformResponse) -> Value {
        match response.outcome {
            TransformOutcome::Payload(payload) => payload,
            TransformOutcome::Error { message } => panic!("unexpected error: {}", message),
        }
    }

    #[tokio::test]
    async fn full_mode_uses_both_sensor_types() {
        let payload = payload_of(
            CovarianceTransform::new()
                .apply(request(
                    StepMode::Full,
                    vec![TransformInput::Raw {
                        category: RawInput::ChannelTypes,
                        reference: "grad+mag".into(),
                    }],
                ))
                .await,
        );
        assert_eq!(payload["rank"], json!(MAG_DOF + GRAD_DOF));
    }

    #[tokio::test]
    async fn narrowed_mode_recomputes_rank_from_available_types() {
        let payload = payload_of(
            CovarianceTransform::new()
                .apply(request(
                    StepMode::Narrowed {
                        available: vec![ChannelType::Mag],
                    },
                    vec![],
                ))
                .await,
        );
        assert_eq!(payload["rank"], json!(MAG_DOF));
        assert_eq!(payload["ch_types"], json!(["mag"]));
    }
}
