// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent per-unit scheduler with branch-level failure isolation.
//!
//! The scheduler walks the step graph once per unit, in parallel across
//! units, consulting the artifact cache before every transform
//! invocation. It is the component that ties the engine's guarantees
//! together:
//!
//! # Execution model
//!
//! - One tokio task per unit, bounded by a semaphore sized to
//!   `max_concurrency`. Units never observe each other's intermediate
//!   state; the artifact cache is the only shared mutable resource.
//! - Within a unit, steps run strictly in the plan's topological order.
//!   A task suspends only while waiting on the cache's per-fingerprint
//!   gate (another worker is computing the same artifact) or on a
//!   transform itself.
//! - Steps whose scope collapses the unit label (session- or
//!   subject-scoped stages) share fingerprints across sibling units; the
//!   cache's single-flight discipline guarantees exactly one computation
//!   and N observers of the same artifact.
//!
//! # Failure handling
//!
//! - A transform error or a required input found missing marks that
//!   (unit, step) pair failed, skips its dependents, and lets the rest of
//!   the unit's plan continue. Sibling units are unaffected; the unit
//!   reports `PartialFailure`.
//! - An artifact whose recorded identity contradicts the consuming step
//!   is a correctness hazard, not missing data: the run is halted. Units
//!   that have not started are cancelled; units already running finish or
//!   fail on their own, so no cache entry is ever torn by cancellation.
//!
//! # Idempotence
//!
//! Re-running with identical configuration and dataset hits the cache for
//! every fingerprint: no transform executes and the artifact set is
//! bit-for-bit identical to the prior run's.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::cache::{step_fingerprint, Artifact, ArtifactCache, CacheStatus};
use crate::config::consts::DEFAULT_CONCURRENCY_FALLBACK;
use crate::config::{Config, StepGraph, TransformMap};
use crate::engine::plan::{build_plan, ExecutionPlan, InputResolution, PlannedStep};
use crate::engine::summary::{RunSummary, UnitOutcome};
use crate::errors::ExecutionError;
use crate::index::{AuxiliaryContext, Unit, UnitIndex};
use crate::observability::messages::engine::RunStarted;
use crate::observability::messages::StructuredLog;
use crate::traits::dataset::DatasetReader;
use crate::traits::events::{EventSink, PipelineEvent};
use crate::traits::transform::{TransformInput, TransformOutcome, TransformRequest};

pub struct Scheduler {
    /// Maximum number of units executing concurrently.
    max_concurrency: usize,
}

impl Scheduler {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Build a scheduler from the configuration's executor options,
    /// defaulting to the number of available CPU cores.
    pub fn from_config(config: &Config) -> Self {
        let max_concurrency = config.executor_options.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_CONCURRENCY_FALLBACK)
        });
        Self::new(max_concurrency)
    }

    /// Execute the step graph for every unit in the index.
    pub async fn run(
        &self,
        index: &UnitIndex,
        graph: Arc<StepGraph>,
        transforms: TransformMap,
        reader: Arc<dyn DatasetReader>,
        cache: Arc<ArtifactCache>,
        sink: Arc<dyn EventSink>,
        config: Arc<Config>,
    ) -> RunSummary {
        RunStarted {
            unit_count: index.len(),
            step_count: graph.len(),
            max_concurrency: self.max_concurrency,
        }
        .log();

        let transforms = Arc::new(transforms);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let cancel = CancellationToken::new();
        let fatal: Arc<StdMutex<Option<String>>> = Arc::new(StdMutex::new(None));

        let mut handles = Vec::with_capacity(index.len());
        for unit in index.units() {
            let task = UnitTask {
                unit: unit.clone(),
                auxiliary: index.auxiliary_for(unit).cloned(),
                graph: graph.clone(),
                transforms: transforms.clone(),
                reader: reader.clone(),
                cache: cache.clone(),
                sink: sink.clone(),
                config: config.clone(),
                semaphore: semaphore.clone(),
                cancel: cancel.clone(),
                fatal: fatal.clone(),
            };
            handles.push((unit.clone(), tokio::spawn(run_unit(task))));
        }

        let mut outcomes = BTreeMap::new();
        for (unit, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => UnitOutcome::Fatal {
                    reason: format!("unit task join failed: {}", e),
                },
            };
            outcomes.insert(unit, outcome);
        }

        let fatal = fatal.lock().expect("fatal slot lock poisoned").clone();
        RunSummary { outcomes, fatal }
    }
}

struct UnitTask {
    unit: Unit,
    auxiliary: Option<AuxiliaryContext>,
    graph: Arc<StepGraph>,
    transforms: Arc<TransformMap>,
    reader: Arc<dyn DatasetReader>,
    cache: Arc<ArtifactCache>,
    sink: Arc<dyn EventSink>,
    config: Arc<Config>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    fatal: Arc<StdMutex<Option<String>>>,
}

async fn run_unit(task: UnitTask) -> UnitOutcome {
    // A fatal error elsewhere cancels units that have not started yet.
    // Once the permit is held, the unit runs to its own conclusion.
    let _permit = tokio::select! {
        _ = task.cancel.cancelled() => {
            let reason = task
                .fatal
                .lock()
                .expect("fatal slot lock poisoned")
                .clone()
                .unwrap_or_else(|| "run aborted".to_string());
            return UnitOutcome::Fatal {
                reason: format!("aborted before start: {}", reason),
            };
        }
        permit = task.semaphore.clone().acquire_owned() => {
            permit.expect("scheduler semaphore is never closed")
        }
    };

    task.sink.emit(&PipelineEvent::UnitStarted {
        unit: task.unit.clone(),
    });

    let plan = build_plan(
        &task.unit,
        &task.graph,
        &task.config,
        task.reader.as_ref(),
        task.auxiliary.as_ref(),
    );

    let outcome = execute_plan(&task, &plan).await;

    task.sink.emit(&PipelineEvent::UnitFinished {
        unit: task.unit.clone(),
        succeeded: outcome.succeeded(),
    });
    outcome
}

async fn execute_plan(task: &UnitTask, plan: &ExecutionPlan) -> UnitOutcome {
    let mut artifacts: BTreeMap<String, Artifact> = BTreeMap::new();
    let mut dead: HashSet<String> = HashSet::new();
    let mut first_failure: Option<(String, String)> = None;

    // Plan-time pruning is already a branch failure; report it the same
    // way a runtime failure would be.
    for pruned in &plan.pruned {
        dead.insert(pruned.id.clone());
        task.sink.emit(&PipelineEvent::BranchFailed {
            unit: task.unit.clone(),
            step: pruned.id.clone(),
            reason: pruned.reason.clone(),
        });
        if first_failure.is_none() {
            first_failure = Some((pruned.id.clone(), pruned.reason.clone()));
        }
    }

    for planned in &plan.steps {
        if dead.contains(planned.id.as_str()) {
            continue;
        }

        emit_missing_data_conditions(task, planned);

        match execute_step(task, planned, &artifacts).await {
            Ok(artifact) => {
                artifacts.insert(planned.id.clone(), artifact);
            }
            Err(error) if error.is_fatal() => {
                let reason = error.to_string();
                {
                    let mut slot = task.fatal.lock().expect("fatal slot lock poisoned");
                    if slot.is_none() {
                        *slot = Some(reason.clone());
                    }
                }
                task.cancel.cancel();
                task.sink.emit(&PipelineEvent::FatalRaised {
                    reason: reason.clone(),
                });
                return UnitOutcome::Fatal { reason };
            }
            Err(error) => {
                let reason = error.to_string();
                task.sink.emit(&PipelineEvent::BranchFailed {
                    unit: task.unit.clone(),
                    step: planned.id.clone(),
                    reason: reason.clone(),
                });
                dead.insert(planned.id.clone());
                dead.extend(task.graph.transitive_dependents(&planned.id));
                if first_failure.is_none() {
                    first_failure = Some((planned.id.clone(), reason));
                }
            }
        }
    }

    match first_failure {
        Some((failed_step, reason)) => UnitOutcome::PartialFailure {
            completed: artifacts.keys().cloned().collect(),
            failed_step,
            reason,
        },
        None => UnitOutcome::Success {
            artifacts: artifacts
                .into_iter()
                .map(|(step, artifact)| (step, artifact.fingerprint))
                .collect(),
        },
    }
}

async fn execute_step(
    task: &UnitTask,
    planned: &PlannedStep,
    artifacts: &BTreeMap<String, Artifact>,
) -> Result<Artifact, ExecutionError> {
    let digests = input_digests(planned, artifacts)?;
    let fingerprint = step_fingerprint(
        &planned.id,
        &planned.scoped_unit,
        &planned.parameters,
        &planned.options,
        &digests,
    );

    let transform = task
        .transforms
        .get(&planned.transform)
        .ok_or_else(|| ExecutionError::Internal {
            message: format!(
                "step '{}' names unregistered transform '{}'",
                planned.id, planned.transform
            ),
        })?
        .clone();

    let request = TransformRequest {
        unit: task.unit.clone(),
        inputs: transform_inputs(planned, artifacts),
        parameters: planned.parameters.clone(),
        options: planned.options.clone(),
        mode: planned.mode.clone(),
    };

    let step_id = planned.id.clone();
    let transform_name = planned.transform.clone();
    let scoped_unit = planned.scoped_unit.clone();
    let fp = fingerprint.clone();

    let (artifact, status) = task
        .cache
        .get_or_compute(&fingerprint, move || async move {
            match transform.apply(request).await.outcome {
                TransformOutcome::Payload(payload) => {
                    Ok(Artifact::new(&fp, step_id, scoped_unit, payload))
                }
                TransformOutcome::Error { message } => Err(ExecutionError::TransformFailed {
                    step: step_id,
                    transform: transform_name,
                    message,
                }),
            }
        })
        .await?;

    let event = match status {
        CacheStatus::Hit => PipelineEvent::CacheHit {
            unit: task.unit.clone(),
            step: planned.id.clone(),
            fingerprint: fingerprint.as_hex().to_string(),
        },
        CacheStatus::Miss | CacheStatus::Recovered => PipelineEvent::CacheMiss {
            unit: task.unit.clone(),
            step: planned.id.clone(),
            fingerprint: fingerprint.as_hex().to_string(),
        },
    };
    task.sink.emit(&event);

    // A cached artifact whose recorded identity disagrees with the step
    // consuming it indicates cross-unit contamination.
    if artifact.unit != planned.scoped_unit || artifact.step != planned.id {
        return Err(ExecutionError::InvariantViolation {
            expected: format!("{}/{}", planned.scoped_unit, planned.id),
            found: format!("{}/{}", artifact.unit, artifact.step),
        });
    }

    Ok(artifact)
}

/// Ordered fingerprint digests for a step's resolved inputs.
fn input_digests(
    planned: &PlannedStep,
    artifacts: &BTreeMap<String, Artifact>,
) -> Result<Vec<Value>, ExecutionError> {
    planned
        .resolutions
        .iter()
        .map(|resolution| match resolution {
            InputResolution::Step { step } => {
                let upstream = artifacts.get(step).ok_or_else(|| ExecutionError::Internal {
                    message: format!(
                        "step '{}' scheduled before its dependency '{}'",
                        planned.id, step
                    ),
                })?;
                Ok(json!({ "artifact": upstream.fingerprint }))
            }
            InputResolution::Raw {
                category,
                reference,
            } => Ok(json!({ "raw": category.name(), "ref": reference })),
            InputResolution::Substituted { category, .. } => {
                Ok(json!({ "substituted": category.name() }))
            }
            InputResolution::Omitted { category } => Ok(json!({ "omitted": category.name() })),
            InputResolution::Narrowed {
                category,
                available,
            } => Ok(json!({
                "narrowed": category.name(),
                "available": available.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            })),
        })
        .collect()
}

/// Materialize the inputs handed to the transform. Omitted and narrowed
/// inputs contribute nothing; the mode tag carries that information.
fn transform_inputs(
    planned: &PlannedStep,
    artifacts: &BTreeMap<String, Artifact>,
) -> Vec<TransformInput> {
    planned
        .resolutions
        .iter()
        .filter_map(|resolution| match resolution {
            InputResolution::Step { step } => artifacts
                .get(step)
                .map(|artifact| TransformInput::Artifact(artifact.clone())),
            InputResolution::Raw {
                category,
                reference,
            } => Some(TransformInput::Raw {
                category: *category,
                reference: reference.clone(),
            }),
            InputResolution::Substituted { category, payload } => Some(TransformInput::Default {
                category: *category,
                payload: payload.clone(),
            }),
            InputResolution::Omitted { .. } | InputResolution::Narrowed { .. } => None,
        })
        .collect()
}

fn emit_missing_data_conditions(task: &UnitTask, planned: &PlannedStep) {
    for resolution in &planned.resolutions {
        match resolution {
            InputResolution::Substituted { category, .. } => {
                task.sink.emit(&PipelineEvent::SubstitutionApplied {
                    unit: task.unit.clone(),
                    step: planned.id.clone(),
                    input: *category,
                });
            }
            InputResolution::Omitted { category } => {
                task.sink.emit(&PipelineEvent::FeatureOmitted {
                    unit: task.unit.clone(),
                    step: planned.id.clone(),
                    input: *category,
                });
            }
            InputResolution::Narrowed { available, .. } => {
                task.sink.emit(&PipelineEvent::ScopeNarrowed {
                    unit: task.unit.clone(),
                    step: planned.id.clone(),
                    available: available.clone(),
                });
            }
            _ => {}
        }
    }
}
