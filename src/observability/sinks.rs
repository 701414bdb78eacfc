// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Mutex;

use crate::observability::messages::{cache, engine, step, StructuredLog};
use crate::traits::events::{EventSink, PipelineEvent};

/// Renders pipeline events through the structured message types.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::UnitStarted { unit } => {
                engine::UnitStarted {
                    unit: &unit.label(),
                }
                .log();
            }
            PipelineEvent::UnitFinished { unit, succeeded } => {
                engine::UnitCompleted {
                    unit: &unit.label(),
                    succeeded: *succeeded,
                }
                .log();
            }
            PipelineEvent::CacheHit {
                unit,
                step,
                fingerprint,
            } => {
                cache::ArtifactCacheHit {
                    unit: &unit.label(),
                    step,
                    fingerprint,
                }
                .log();
            }
            PipelineEvent::CacheMiss {
                unit,
                step,
                fingerprint,
            } => {
                cache::ArtifactCacheMiss {
                    unit: &unit.label(),
                    step,
                    fingerprint,
                }
                .log();
            }
            PipelineEvent::SubstitutionApplied { unit, step, input } => {
                step::SubstitutionApplied {
                    unit: &unit.label(),
                    step,
                    input: input.name(),
                }
                .log();
            }
            PipelineEvent::FeatureOmitted { unit, step, input } => {
                step::FeatureOmitted {
                    unit: &unit.label(),
                    step,
                    input: input.name(),
                }
                .log();
            }
            PipelineEvent::ScopeNarrowed {
                unit,
                step,
                available,
            } => {
                let available = available
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                step::ScopeNarrowed {
                    unit: &unit.label(),
                    step,
                    available: &available,
                }
                .log();
            }
            PipelineEvent::BranchFailed { unit, step, reason } => {
                engine::UnitBranchFailed {
                    unit: &unit.label(),
                    step,
                    reason,
                }
                .log();
            }
            PipelineEvent::FatalRaised { reason } => {
                engine::FatalErrorRaised { reason }.log();
            }
        }
    }
}

/// Records every emitted event verbatim; used by tests to assert on the
/// engine's event stream.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .expect("collecting sink lock poisoned")
            .clone()
    }

    /// Count events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .expect("collecting sink lock poisoned")
            .push(event.clone());
    }
}
