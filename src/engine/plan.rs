// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-unit execution planning.
//!
//! A unit's plan is derived once, before any step runs: the step graph's
//! topological order is specialized against the data that actually exists
//! for the unit. Every optional-input decision (substitute a default,
//! omit a feature, narrow to the available channel types) is resolved
//! here into a tagged variant, so step bodies never re-inspect the
//! dataset at runtime. Steps whose required inputs are known to be absent
//! are pruned together with their dependents; pruning degrades exactly
//! one branch and is reported in the unit's outcome, never escalated.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, InputPolicy, StepConfig, StepGraph};
use crate::index::{AuxiliaryContext, Unit};
use crate::traits::dataset::{ChannelType, DatasetReader, RawInput};

/// How a step was specialized for a unit at plan-build time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepMode {
    /// All declared inputs resolved; run the full algorithm.
    Full,
    /// Optional features were omitted; run the documented reduced form.
    Reduced { omitted: Vec<RawInput> },
    /// Structural elements were missing; re-parameterize against what
    /// exists (e.g. recompute rank from the one sensor type present).
    Narrowed { available: Vec<ChannelType> },
}

/// One declared input after resolution against a unit's actual data.
#[derive(Debug, Clone, PartialEq)]
pub enum InputResolution {
    /// Upstream step output, consumed by fingerprint reference.
    Step { step: String },
    /// Raw per-unit data that exists; `reference` names it stably.
    Raw { category: RawInput, reference: String },
    /// Absent resource replaced by the built-in default.
    Substituted { category: RawInput, payload: Value },
    /// Absent optional feature dropped from this invocation.
    Omitted { category: RawInput },
    /// Structural narrowing to the channel types actually present.
    Narrowed {
        category: RawInput,
        available: Vec<ChannelType>,
    },
}

/// A step scheduled to run for one unit.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub id: String,
    pub transform: String,
    pub scoped_unit: String,
    pub resolutions: Vec<InputResolution>,
    pub mode: StepMode,
    pub parameters: Value,
    pub options: Value,
}

/// A step removed from the plan before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PrunedStep {
    pub id: String,
    pub reason: String,
}

/// Topologically ordered, unit-specialized list of steps to execute.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub unit: Unit,
    pub steps: Vec<PlannedStep>,
    pub pruned: Vec<PrunedStep>,
}

impl ExecutionPlan {
    pub fn planned_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Build the execution plan for one unit.
pub fn build_plan(
    unit: &Unit,
    graph: &StepGraph,
    config: &Config,
    reader: &dyn DatasetReader,
    auxiliary: Option<&AuxiliaryContext>,
) -> ExecutionPlan {
    let mut steps = Vec::new();
    let mut pruned = Vec::new();
    let mut pruned_ids: HashSet<String> = HashSet::new();

    for id in graph.topological_order() {
        let step = graph.step(id).expect("topological order names real steps");

        if let Some(dep) = graph
            .dependencies_of(id)
            .iter()
            .find(|d| pruned_ids.contains(d.as_str()))
        {
            pruned.push(PrunedStep {
                id: id.clone(),
                reason: format!("depends on pruned step '{}'", dep),
            });
            pruned_ids.insert(id.clone());
            continue;
        }

        match resolve_step(unit, step, config, reader, auxiliary) {
            Ok(planned) => steps.push(planned),
            Err(reason) => {
                pruned.push(PrunedStep {
                    id: id.clone(),
                    reason,
                });
                pruned_ids.insert(id.clone());
            }
        }
    }

    ExecutionPlan {
        unit: unit.clone(),
        steps,
        pruned,
    }
}

fn resolve_step(
    unit: &Unit,
    step: &StepConfig,
    config: &Config,
    reader: &dyn DatasetReader,
    auxiliary: Option<&AuxiliaryContext>,
) -> Result<PlannedStep, String> {
    let mut resolutions = Vec::new();

    for input in &step.inputs {
        if let Some(dep) = &input.step {
            resolutions.push(InputResolution::Step { step: dep.clone() });
            continue;
        }

        let category = input.raw.expect("validated: input names exactly one source");
        match resolve_raw(unit, config, reader, auxiliary, category) {
            Some(resolution) => resolutions.push(resolution),
            None => resolutions.push(resolve_absent(unit, config, reader, category, input)?),
        }
    }

    // Dependencies declared without a matching input still feed the
    // fingerprint, so edits upstream propagate to every consumer.
    for dep in step.dependencies() {
        let already_declared = resolutions
            .iter()
            .any(|r| matches!(r, InputResolution::Step { step } if *step == dep));
        if !already_declared {
            resolutions.push(InputResolution::Step { step: dep });
        }
    }

    let mode = derive_mode(&resolutions);

    Ok(PlannedStep {
        id: step.id.clone(),
        transform: step.transform.clone(),
        scoped_unit: step.scope.label_for(unit),
        resolutions,
        mode,
        parameters: config.parameter_slice(step),
        options: step.options.clone(),
    })
}

/// Resolve a raw category that is present for the unit; `None` means
/// absent and defers to the input's policy.
fn resolve_raw(
    unit: &Unit,
    config: &Config,
    reader: &dyn DatasetReader,
    auxiliary: Option<&AuxiliaryContext>,
    category: RawInput,
) -> Option<InputResolution> {
    match category {
        RawInput::EmptyRoom => auxiliary.map(|aux| InputResolution::Raw {
            category,
            reference: aux.label.clone(),
        }),
        RawInput::ChannelTypes => {
            let available = available_channel_types(unit, config, reader);
            if available.is_empty() {
                return None;
            }
            if available.len() < config.ch_types.len() {
                Some(InputResolution::Narrowed {
                    category,
                    available,
                })
            } else {
                let reference = available
                    .iter()
                    .map(ChannelType::to_string)
                    .collect::<Vec<_>>()
                    .join("+");
                Some(InputResolution::Raw {
                    category,
                    reference,
                })
            }
        }
        _ => reader
            .has_input(unit, category)
            .then(|| InputResolution::Raw {
                category,
                reference: raw_reference(unit, category),
            }),
    }
}

/// Apply the input's policy to an absent resource.
fn resolve_absent(
    unit: &Unit,
    config: &Config,
    reader: &dyn DatasetReader,
    category: RawInput,
    input: &crate::config::InputConfig,
) -> Result<InputResolution, String> {
    match input.policy {
        InputPolicy::Required => Err(format!("required input '{}' missing", category)),
        InputPolicy::SubstituteDefault if input.required => Err(format!(
            "input '{}' marked required is missing",
            category
        )),
        InputPolicy::SubstituteDefault => Ok(InputResolution::Substituted {
            category,
            payload: category.builtin_default(),
        }),
        InputPolicy::OmitFeature => Ok(InputResolution::Omitted { category }),
        InputPolicy::NarrowScope => {
            let available = available_channel_types(unit, config, reader);
            if available.is_empty() {
                Err(format!(
                    "cannot narrow '{}': no supported channel types present",
                    category
                ))
            } else {
                Ok(InputResolution::Narrowed {
                    category,
                    available,
                })
            }
        }
    }
}

/// Channel types present in the recording and allowed by configuration,
/// in canonical order.
fn available_channel_types(
    unit: &Unit,
    config: &Config,
    reader: &dyn DatasetReader,
) -> Vec<ChannelType> {
    let mut available: Vec<ChannelType> = reader
        .channel_types(unit)
        .into_iter()
        .filter(|t| config.ch_types.contains(t))
        .collect();
    available.sort();
    available.dedup();
    available
}

fn raw_reference(unit: &Unit, category: RawInput) -> String {
    match category {
        RawInput::Recording => unit.label(),
        RawInput::Chpi => format!("{}_chpi", unit.label()),
        RawInput::Calibration => format!("sub-{}_cal", unit.subject),
        RawInput::CrossTalk => format!("sub-{}_ct", unit.subject),
        // EmptyRoom and ChannelTypes resolve through their own arms above.
        RawInput::EmptyRoom | RawInput::ChannelTypes => unit.label(),
    }
}

fn derive_mode(resolutions: &[InputResolution]) -> StepMode {
    for resolution in resolutions {
        if let InputResolution::Narrowed { available, .. } = resolution {
            return StepMode::Narrowed {
                available: available.clone(),
            };
        }
    }

    let omitted: Vec<RawInput> = resolutions
        .iter()
        .filter_map(|r| match r {
            InputResolution::Omitted { category } => Some(*category),
            _ => None,
        })
        .collect();

    if omitted.is_empty() {
        StepMode::Full
    } else {
        StepMode::Reduced { omitted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::manifest::ManifestDataset;
    use crate::index::UnitIndex;

    fn dataset(yaml: &str) -> ManifestDataset {
        ManifestDataset::from_yaml(yaml).expect("manifest parses")
    }

    fn config(yaml: &str) -> Config {
        let mut config: Config = serde_yaml::from_str(yaml).expect("config parses");
        crate::config::validate_and_correct(&mut config).expect("config validates");
        config
    }

    fn plan_for_first_unit(dataset: &ManifestDataset, config: &Config) -> ExecutionPlan {
        let index = UnitIndex::build(dataset, config).unwrap();
        let unit = index.units().first().expect("at least one unit").clone();
        let graph = StepGraph::from_config(config).expect("acyclic");
        build_plan(&unit, &graph, config, dataset, index.auxiliary_for(&unit))
    }

    #[test]
    fn fully_present_inputs_plan_in_full_mode() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    has_calibration: true
    sessions:
      - id: "a"
        runs: ["01"]
        has_chpi: true
"#,
        );
        let config = config(
            r#"
steps:
  - id: filter
    transform: bandpass
    inputs:
      - raw: recording
      - raw: chpi
        policy: omit_feature
"#,
        );

        let plan = plan_for_first_unit(&dataset, &config);
        assert!(plan.pruned.is_empty());
        assert_eq!(plan.steps[0].mode, StepMode::Full);
        assert_eq!(
            plan.steps[0].resolutions,
            vec![
                InputResolution::Raw {
                    category: RawInput::Recording,
                    reference: "sub-01_ses-a_run-01".into(),
                },
                InputResolution::Raw {
                    category: RawInput::Chpi,
                    reference: "sub-01_ses-a_run-01_chpi".into(),
                },
            ]
        );
    }

    #[test]
    fn absent_chpi_is_omitted_and_mode_reduced() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
        );
        let config = config(
            r#"
steps:
  - id: filter
    transform: bandpass
    inputs:
      - raw: recording
      - raw: chpi
        policy: omit_feature
"#,
        );

        let plan = plan_for_first_unit(&dataset, &config);
        assert_eq!(
            plan.steps[0].mode,
            StepMode::Reduced {
                omitted: vec![RawInput::Chpi]
            }
        );
    }

    #[test]
    fn absent_calibration_is_substituted() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
        );
        let config = config(
            r#"
steps:
  - id: maxwell
    transform: maxwell
    inputs:
      - raw: recording
      - raw: calibration
        policy: substitute_default
"#,
        );

        let plan = plan_for_first_unit(&dataset, &config);
        assert!(matches!(
            &plan.steps[0].resolutions[1],
            InputResolution::Substituted {
                category: RawInput::Calibration,
                ..
            }
        ));
        // Substitution is a warning-level condition; the mode stays full.
        assert_eq!(plan.steps[0].mode, StepMode::Full);
    }

    #[test]
    fn required_substitute_default_prunes_the_branch() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
        );
        let config = config(
            r#"
steps:
  - id: maxwell
    transform: maxwell
    inputs:
      - raw: recording
      - raw: calibration
        policy: substitute_default
        required: true
  - id: epochs
    transform: epochs
    depends_on: [maxwell]
"#,
        );

        let plan = plan_for_first_unit(&dataset, &config);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.pruned.len(), 2);
        assert!(plan.pruned[0].reason.contains("calibration"));
        assert_eq!(plan.pruned[1].reason, "depends on pruned step 'maxwell'");
    }

    #[test]
    fn single_sensor_type_narrows_scope() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
        channel_types: [mag]
"#,
        );
        let config = config(
            r#"
ch_types: [mag, grad]
steps:
  - id: cov
    transform: covariance
    inputs:
      - raw: recording
      - raw: channel_types
        policy: narrow_scope
"#,
        );

        let plan = plan_for_first_unit(&dataset, &config);
        assert_eq!(
            plan.steps[0].mode,
            StepMode::Narrowed {
                available: vec![ChannelType::Mag]
            }
        );
    }

    #[test]
    fn implicit_dependencies_become_step_resolutions() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
        );
        let config = config(
            r#"
steps:
  - id: filter
    transform: bandpass
    inputs:
      - raw: recording
  - id: epochs
    transform: epochs
    depends_on: [filter]
"#,
        );

        let plan = plan_for_first_unit(&dataset, &config);
        assert_eq!(plan.planned_ids(), vec!["filter", "epochs"]);
        assert_eq!(
            plan.steps[1].resolutions,
            vec![InputResolution::Step {
                step: "filter".into()
            }]
        );
    }

    #[test]
    fn subject_scope_collapses_the_unit_label() {
        let dataset = dataset(
            r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01", "02"]
"#,
        );
        let config = config(
            r#"
steps:
  - id: bem
    transform: covariance
    scope: subject
"#,
        );

        let index = UnitIndex::build(&dataset, &config).unwrap();
        let graph = StepGraph::from_config(&config).unwrap();
        let scoped: Vec<String> = index
            .units()
            .iter()
            .map(|u| {
                build_plan(u, &graph, &config, &dataset, None).steps[0]
                    .scoped_unit
                    .clone()
            })
            .collect();
        assert_eq!(scoped, vec!["sub-01", "sub-01"]);
    }
}
