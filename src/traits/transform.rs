use async_trait::async_trait;
use serde_json::Value;

use crate::cache::Artifact;
use crate::engine::StepMode;
use crate::index::Unit;
use crate::traits::dataset::RawInput;

/// A resolved input handed to a transform.
///
/// `Artifact` carries an upstream step's output; `Raw` is a reference to
/// per-unit data the transform resolves itself; `Default` is the built-in
/// stand-in injected by the substitute-default policy.
#[derive(Debug, Clone)]
pub enum TransformInput {
    Artifact(Artifact),
    Raw { category: RawInput, reference: String },
    Default { category: RawInput, payload: Value },
}

/// Everything a transform needs for one invocation: the unit, its resolved
/// inputs in declaration order, the allow-listed parameter slice, the
/// opaque passthrough options, and the plan-time mode tag.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub unit: Unit,
    pub inputs: Vec<TransformInput>,
    pub parameters: Value,
    pub options: Value,
    pub mode: StepMode,
}

/// Result of one transform invocation.
#[derive(Debug, Clone)]
pub enum TransformOutcome {
    /// The output payload; the engine stores it without interpreting it.
    Payload(Value),
    /// A transform-specific failure, isolated to the owning branch.
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct TransformResponse {
    pub outcome: TransformOutcome,
}

impl TransformResponse {
    pub fn payload(value: Value) -> Self {
        Self {
            outcome: TransformOutcome::Payload(value),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            outcome: TransformOutcome::Error {
                message: message.into(),
            },
        }
    }
}

/// An opaque numerical processing stage.
///
/// The engine invokes transforms through this trait and treats them as
/// blocking external work; it never inspects their internals.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, req: TransformRequest) -> TransformResponse;

    fn name(&self) -> &'static str;
}
