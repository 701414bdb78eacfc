use crate::index::Unit;
use crate::traits::dataset::{ChannelType, RawInput};

/// Structured events emitted by the engine during a run.
///
/// The engine only emits; formatting and rendering belong to the sink.
/// Missing-optional-data conditions (`SubstitutionApplied`,
/// `FeatureOmitted`, `ScopeNarrowed`) are warning-level conditions, not
/// errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    UnitStarted {
        unit: Unit,
    },
    UnitFinished {
        unit: Unit,
        succeeded: bool,
    },
    CacheHit {
        unit: Unit,
        step: String,
        fingerprint: String,
    },
    CacheMiss {
        unit: Unit,
        step: String,
        fingerprint: String,
    },
    SubstitutionApplied {
        unit: Unit,
        step: String,
        input: RawInput,
    },
    FeatureOmitted {
        unit: Unit,
        step: String,
        input: RawInput,
    },
    ScopeNarrowed {
        unit: Unit,
        step: String,
        available: Vec<ChannelType>,
    },
    BranchFailed {
        unit: Unit,
        step: String,
        reason: String,
    },
    FatalRaised {
        reason: String,
    },
}

/// Receiver for engine events. Implementations must tolerate concurrent
/// emission from multiple unit tasks.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}
