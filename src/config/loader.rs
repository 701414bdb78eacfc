// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ConfigError;
use crate::observability::messages::validation::OrderingEdgeInserted;
use crate::observability::messages::StructuredLog;
use crate::traits::dataset::{ChannelType, RawInput};

/// Main configuration structure for a pipeline run.
///
/// Typically loaded from a YAML file. Selections restrict the enumerated
/// unit space; `parameters` holds the flat option map steps draw their
/// fingerprint slices from; `steps` declares the processing graph.
///
/// # Example
/// ```yaml
/// subjects: ["01", "02"]
/// sessions: all
/// runs: all
/// task: facerecognition
/// allow_missing_sessions: true
/// process_empty_room: true
/// cache_root: ./cache
/// parameters:
///   l_freq: 0.1
///   h_freq: 40.0
/// steps:
///   - id: filter
///     transform: bandpass
///     inputs:
///       - raw: recording
///       - raw: chpi
///         policy: omit_feature
///     config_keys: [l_freq, h_freq]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub subjects: Selection,
    #[serde(default)]
    pub exclude_subjects: Vec<String>,
    #[serde(default)]
    pub sessions: Selection,
    #[serde(default)]
    pub runs: Selection,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default = "default_ch_types")]
    pub ch_types: Vec<ChannelType>,
    #[serde(default)]
    pub allow_missing_sessions: bool,
    #[serde(default)]
    pub process_empty_room: bool,
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub ordering_constraints: Vec<OrderingConstraint>,
}

fn default_ch_types() -> Vec<ChannelType> {
    vec![ChannelType::Mag, ChannelType::Grad]
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("./cache")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subjects: Selection::all(),
            exclude_subjects: Vec::new(),
            sessions: Selection::all(),
            runs: Selection::all(),
            task: None,
            ch_types: default_ch_types(),
            allow_missing_sessions: false,
            process_empty_room: false,
            cache_root: default_cache_root(),
            executor_options: ExecutorOptions::default(),
            parameters: BTreeMap::new(),
            steps: Vec::new(),
            ordering_constraints: Vec::new(),
        }
    }
}

impl Config {
    /// Extract the allow-listed parameter slice for one step: a JSON
    /// object holding exactly the keys the step declares, with `null`
    /// for keys the configuration does not set.
    pub fn parameter_slice(&self, step: &StepConfig) -> Value {
        let mut slice = serde_json::Map::new();
        for key in &step.config_keys {
            let value = self.parameters.get(key).cloned().unwrap_or(Value::Null);
            slice.insert(key.clone(), value);
        }
        Value::Object(slice)
    }
}

/// An include filter over one unit dimension: either the keyword `all`
/// or an explicit list of identifiers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    List(Vec<String>),
    Keyword(String),
}

impl Selection {
    pub fn all() -> Self {
        Selection::Keyword("all".to_string())
    }

    pub fn includes(&self, value: &str) -> bool {
        match self {
            Selection::List(items) => items.iter().any(|v| v == value),
            Selection::Keyword(_) => true,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::all()
    }
}

/// Executor-specific configuration options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
}

/// Fallback behavior when a declared input is absent for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPolicy {
    /// Absence fails this (unit, step) branch and its dependents.
    #[default]
    Required,
    /// Run with documented reduced behavior, dropping the feature.
    OmitFeature,
    /// Re-parameterize against whatever structural elements exist.
    NarrowScope,
    /// Proceed with a built-in default, recorded as a warning condition.
    SubstituteDefault,
}

/// One declared step input: an upstream step's output or a raw per-unit
/// data category, plus its absence policy.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub raw: Option<RawInput>,
    #[serde(default)]
    pub policy: InputPolicy,
    /// Promotes a substitute-default resource to hard-required.
    #[serde(default)]
    pub required: bool,
}

/// The unit dimensions a step's output identity spans.
///
/// A `subject`-scoped step (a structural model, a calibration fit)
/// produces one artifact per subject; every run-level unit of that
/// subject resolves to the same fingerprint and the cache's single-flight
/// discipline makes sure it is computed once. Inputs declared by such a
/// step should themselves be subject-scoped resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepScope {
    #[default]
    Unit,
    Session,
    Subject,
}

impl StepScope {
    /// The identity label a unit contributes to this step's fingerprint.
    pub fn label_for(&self, unit: &crate::index::Unit) -> String {
        match self {
            StepScope::Unit => unit.label(),
            StepScope::Session => crate::index::Unit {
                subject: unit.subject.clone(),
                session: unit.session.clone(),
                run: None,
                task: unit.task.clone(),
            }
            .label(),
            StepScope::Subject => format!("sub-{}", unit.subject),
        }
    }
}

/// Static definition of one processing stage.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub id: String,
    pub transform: String,
    #[serde(default)]
    pub scope: StepScope,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    /// Configuration keys this step's fingerprint depends on.
    #[serde(default)]
    pub config_keys: Vec<String>,
    /// Opaque passthrough options forwarded verbatim to the transform
    /// and hashed verbatim into the fingerprint.
    #[serde(default)]
    pub options: Value,
}

impl StepConfig {
    /// Dependencies implied by `depends_on` plus step-typed inputs,
    /// deduplicated, declaration order preserved.
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for dep in self
            .depends_on
            .iter()
            .chain(self.inputs.iter().filter_map(|i| i.step.as_ref()))
        {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }
}

/// Structural ordering between two corrective stages: `before` must be
/// scheduled strictly before `after` whenever both are declared.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderingConstraint {
    pub before: String,
    pub after: String,
}

/// Load a configuration file without validating it.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a configuration file, validate it, and apply ordering
/// auto-corrections. Corrections are logged as warnings; genuine
/// structural problems abort with `ConfigError::Invalid`.
pub fn load_and_validate_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    match super::validation::validate_and_correct(&mut config) {
        Ok(warnings) => {
            for warning in &warnings {
                match warning {
                    super::ValidationWarning::OrderingEdgeInserted { before, after } => {
                        OrderingEdgeInserted { before, after }.log();
                    }
                }
            }
            Ok(config)
        }
        Err(errors) => {
            for error in &errors {
                tracing::error!("configuration validation error: {}", error);
            }
            Err(ConfigError::Invalid { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_keyword_includes_everything() {
        let selection = Selection::all();
        assert!(selection.includes("01"));
        assert!(selection.includes("anything"));
    }

    #[test]
    fn selection_list_is_exact() {
        let selection = Selection::List(vec!["01".into()]);
        assert!(selection.includes("01"));
        assert!(!selection.includes("02"));
    }

    #[test]
    fn parameter_slice_is_allow_listed() {
        let mut config = Config::default();
        config
            .parameters
            .insert("l_freq".into(), serde_json::json!(0.1));
        config
            .parameters
            .insert("unrelated".into(), serde_json::json!(99));

        let step: StepConfig = serde_yaml::from_str(
            r#"
id: filter
transform: bandpass
config_keys: [l_freq, h_freq]
"#,
        )
        .unwrap();

        let slice = config.parameter_slice(&step);
        assert_eq!(
            slice,
            serde_json::json!({"l_freq": 0.1, "h_freq": null}),
            "unset keys surface as null, unrelated keys never enter"
        );
    }

    #[test]
    fn step_dependencies_merge_depends_on_and_inputs() {
        let step: StepConfig = serde_yaml::from_str(
            r#"
id: cov
transform: covariance
depends_on: [filter]
inputs:
  - step: filter
  - step: epochs
  - raw: recording
"#,
        )
        .unwrap();
        assert_eq!(step.dependencies(), vec!["filter", "epochs"]);
    }

    #[test]
    fn full_config_round_trips_from_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
subjects: ["01"]
sessions: all
task: rest
process_empty_room: true
parameters:
  l_freq: 0.1
steps:
  - id: filter
    transform: bandpass
    inputs:
      - raw: recording
      - raw: chpi
        policy: omit_feature
    config_keys: [l_freq]
    options:
      picks: meg
ordering_constraints:
  - before: filter
    after: maxwell
"#,
        )
        .unwrap();

        assert!(config.subjects.includes("01"));
        assert!(!config.subjects.includes("02"));
        assert_eq!(config.task.as_deref(), Some("rest"));
        assert_eq!(config.steps.len(), 1);
        let input = &config.steps[0].inputs[1];
        assert_eq!(input.raw, Some(RawInput::Chpi));
        assert_eq!(input.policy, InputPolicy::OmitFeature);
        assert_eq!(config.ordering_constraints.len(), 1);
    }
}
