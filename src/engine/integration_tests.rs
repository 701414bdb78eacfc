// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end scheduler tests: idempotence, fingerprint sensitivity,
//! failure isolation, auxiliary matching, and single-flight caching.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::backends::manifest::ManifestDataset;
use crate::backends::stub::{FailingTransform, SlowTransform, StubTransform};
use crate::cache::{step_fingerprint, Artifact, ArtifactCache};
use crate::config::{Config, StepGraph, TransformMap};
use crate::engine::{RunSummary, Scheduler, UnitOutcome};
use crate::index::{Unit, UnitIndex};
use crate::observability::CollectingSink;
use crate::traits::events::PipelineEvent;

fn config_from(yaml: &str) -> Config {
    let mut config: Config = serde_yaml::from_str(yaml).expect("test config parses");
    crate::config::validate_and_correct(&mut config).expect("test config validates");
    config
}

fn dataset_from(yaml: &str) -> ManifestDataset {
    ManifestDataset::from_yaml(yaml).expect("test manifest parses")
}

/// Registry of counting stubs, one per transform name.
fn stub_map(names: &[&str]) -> (TransformMap, HashMap<String, Arc<AtomicUsize>>) {
    let mut map = TransformMap::new();
    let mut counters = HashMap::new();
    for name in names {
        let stub = StubTransform::new(name.to_string());
        counters.insert(name.to_string(), stub.counter());
        map.insert(name.to_string(), Arc::new(stub));
    }
    (map, counters)
}

async fn run_once(
    config: &Config,
    dataset: &ManifestDataset,
    transforms: TransformMap,
    cache_dir: &Path,
) -> (RunSummary, Arc<CollectingSink>) {
    let index = UnitIndex::build(dataset, config).expect("units enumerate");
    let graph = Arc::new(StepGraph::from_config(config).expect("graph builds"));
    let cache = Arc::new(ArtifactCache::open(cache_dir).expect("cache opens"));
    let sink = Arc::new(CollectingSink::new());

    let summary = Scheduler::new(4)
        .run(
            &index,
            graph,
            transforms,
            Arc::new(dataset.clone()),
            cache,
            sink.clone(),
            Arc::new(config.clone()),
        )
        .await;
    (summary, sink)
}

const CHAIN_CONFIG: &str = r#"
steps:
  - id: filter
    transform: stub
    inputs:
      - raw: recording
  - id: epochs
    transform: stub
    depends_on: [filter]
  - id: cov
    transform: stub
    depends_on: [epochs]
"#;

const TWO_SUBJECT_DATASET: &str = r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
  - id: "02"
    sessions:
      - id: "a"
        runs: ["01"]
"#;

#[tokio::test]
async fn second_run_is_idempotent_and_recomputes_nothing() {
    let config = config_from(CHAIN_CONFIG);
    let dataset = dataset_from(TWO_SUBJECT_DATASET);
    let cache_dir = tempfile::tempdir().unwrap();

    let (map, counters) = stub_map(&["stub"]);
    let (first, first_sink) = run_once(&config, &dataset, map, cache_dir.path()).await;
    assert_eq!(first.succeeded_count(), 2);
    assert_eq!(counters["stub"].load(Ordering::SeqCst), 6);
    assert_eq!(
        first_sink.count(|e| matches!(e, PipelineEvent::CacheMiss { .. })),
        6
    );

    // Fresh transforms and a fresh cache handle over the same directory:
    // the equivalent of a process restart.
    let (map, counters) = stub_map(&["stub"]);
    let (second, second_sink) = run_once(&config, &dataset, map, cache_dir.path()).await;
    assert_eq!(counters["stub"].load(Ordering::SeqCst), 0);
    assert_eq!(
        second_sink.count(|e| matches!(e, PipelineEvent::CacheHit { .. })),
        6
    );
    assert_eq!(
        first.outcomes, second.outcomes,
        "artifact set must be identical across runs"
    );
}

#[tokio::test]
async fn parameter_edit_recomputes_only_the_step_and_its_dependents() {
    let config = config_from(
        r#"
parameters:
  l_freq: 0.1
steps:
  - id: filter
    transform: stub
    inputs:
      - raw: recording
    config_keys: [l_freq]
  - id: epochs
    transform: stub
    depends_on: [filter]
  - id: unrelated
    transform: stub
    inputs:
      - raw: recording
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let (map, _) = stub_map(&["stub"]);
    let (first, _) = run_once(&config, &dataset, map, cache_dir.path()).await;

    let mut edited = config.clone();
    edited.parameters.insert("l_freq".into(), json!(1.0));

    let (map, counters) = stub_map(&["stub"]);
    let (second, sink) = run_once(&edited, &dataset, map, cache_dir.path()).await;

    assert_eq!(counters["stub"].load(Ordering::SeqCst), 2);
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::CacheMiss { .. })),
        2,
        "filter and epochs recompute"
    );
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::CacheHit { step, .. } if step == "unrelated")),
        1,
        "unrelated step stays cached"
    );

    let fingerprints = |summary: &RunSummary| -> HashMap<String, String> {
        match summary.outcomes.values().next().unwrap() {
            UnitOutcome::Success { artifacts } => artifacts.clone().into_iter().collect(),
            other => panic!("expected success, got {:?}", other),
        }
    };
    let before = fingerprints(&first);
    let after = fingerprints(&second);
    assert_ne!(before["filter"], after["filter"]);
    assert_ne!(before["epochs"], after["epochs"]);
    assert_eq!(before["unrelated"], after["unrelated"]);
}

#[tokio::test]
async fn missing_required_input_degrades_one_unit_not_the_run() {
    let config = config_from(
        r#"
steps:
  - id: filter
    transform: stub
    inputs:
      - raw: recording
  - id: maxwell
    transform: stub
    depends_on: [filter]
    inputs:
      - step: filter
      - raw: calibration
  - id: cov
    transform: stub
    depends_on: [maxwell]
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    has_calibration: true
    sessions:
      - id: "a"
        runs: ["01"]
  - id: "02"
    sessions:
      - id: "a"
        runs: ["01"]
  - id: "03"
    has_calibration: true
    sessions:
      - id: "a"
        runs: ["01"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let (map, _) = stub_map(&["stub"]);
    let (summary, sink) = run_once(&config, &dataset, map, cache_dir.path()).await;

    assert!(!summary.is_fatal());
    assert_eq!(summary.succeeded_count(), 2);
    assert_eq!(summary.partial_failure_count(), 1);

    let failing_unit = Unit {
        subject: "02".into(),
        session: Some("a".into()),
        run: Some("01".into()),
        task: None,
    };
    match summary.outcome(&failing_unit).unwrap() {
        UnitOutcome::PartialFailure {
            completed,
            failed_step,
            reason,
        } => {
            assert_eq!(completed, &vec!["filter".to_string()]);
            assert_eq!(failed_step, "maxwell");
            assert!(reason.contains("calibration"));
        }
        other => panic!("expected partial failure, got {:?}", other),
    }

    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::BranchFailed { step, .. } if step == "maxwell")),
        1
    );
}

#[tokio::test]
async fn transform_error_skips_dependents_but_independent_steps_finish() {
    let config = config_from(
        r#"
steps:
  - id: bad
    transform: failing
    inputs:
      - raw: recording
  - id: downstream
    transform: stub
    depends_on: [bad]
  - id: good
    transform: stub
    inputs:
      - raw: recording
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let (mut map, _) = stub_map(&["stub"]);
    map.insert(
        "failing".to_string(),
        Arc::new(FailingTransform::new("bad".to_string())),
    );

    let (summary, _) = run_once(&config, &dataset, map, cache_dir.path()).await;

    match summary.outcomes.values().next().unwrap() {
        UnitOutcome::PartialFailure {
            completed,
            failed_step,
            ..
        } => {
            assert_eq!(failed_step, "bad");
            assert_eq!(
                completed,
                &vec!["good".to_string()],
                "independent branch completes, dependent never runs"
            );
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
}

#[tokio::test]
async fn tolerated_ragged_sessions_schedule_whatever_exists() {
    let config = config_from(
        r#"
allow_missing_sessions: true
steps:
  - id: filter
    transform: stub
    inputs:
      - raw: recording
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "A"
    sessions:
      - id: "1"
        runs: ["01"]
      - id: "2"
        runs: ["01"]
  - id: "B"
    sessions:
      - id: "1"
        runs: ["01"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let (map, _) = stub_map(&["stub"]);
    let (summary, _) = run_once(&config, &dataset, map, cache_dir.path()).await;

    let labels: Vec<String> = summary.outcomes.keys().map(Unit::label).collect();
    assert_eq!(
        labels,
        vec!["sub-A_ses-1_run-01", "sub-A_ses-2_run-01", "sub-B_ses-1_run-01"]
    );
    assert_eq!(summary.succeeded_count(), 3);
    assert!(!summary.is_fatal());
}

#[tokio::test]
async fn shared_auxiliary_recording_fingerprints_per_session() {
    let config = config_from(
        r#"
process_empty_room: true
steps:
  - id: noise
    transform: stub
    inputs:
      - raw: recording
      - raw: empty_room
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
        has_empty_room: true
      - id: "b"
        runs: ["01"]
        has_empty_room: true
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let (map, counters) = stub_map(&["stub"]);
    let (summary, _) = run_once(&config, &dataset, map, cache_dir.path()).await;

    assert_eq!(summary.succeeded_count(), 2);
    assert_eq!(
        counters["stub"].load(Ordering::SeqCst),
        2,
        "one auxiliary recording, but one computation per consuming session"
    );

    let fingerprints: Vec<String> = summary
        .outcomes
        .values()
        .map(|o| match o {
            UnitOutcome::Success { artifacts } => artifacts["noise"].clone(),
            other => panic!("expected success, got {:?}", other),
        })
        .collect();
    assert_ne!(
        fingerprints[0], fingerprints[1],
        "sessions must not merge into one cached artifact"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subject_scoped_step_is_computed_once_across_units() {
    let config = config_from(
        r#"
steps:
  - id: bem
    transform: slow
    scope: subject
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01", "02", "03", "04"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let slow = SlowTransform::new(Duration::from_millis(20));
    let counter = slow.counter();
    let mut map = TransformMap::new();
    map.insert("slow".to_string(), Arc::new(slow));

    let (summary, _) = run_once(&config, &dataset, map, cache_dir.path()).await;

    assert_eq!(summary.succeeded_count(), 4);
    assert_eq!(
        counter.load(Ordering::SeqCst),
        1,
        "four concurrent units converge on a single computation"
    );

    let fingerprints: Vec<String> = summary
        .outcomes
        .values()
        .map(|o| match o {
            UnitOutcome::Success { artifacts } => artifacts["bem"].clone(),
            other => panic!("expected success, got {:?}", other),
        })
        .collect();
    assert!(
        fingerprints.windows(2).all(|w| w[0] == w[1]),
        "all consumers observe the same artifact"
    );
}

#[tokio::test]
async fn contaminated_cache_identity_halts_the_run() {
    let config = config_from(
        r#"
subjects: ["01"]
steps:
  - id: filter
    transform: stub
    inputs:
      - raw: recording
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    // Seed the exact fingerprint the scheduler will compute with an
    // artifact recorded against a different subject.
    let fingerprint = step_fingerprint(
        "filter",
        "sub-01_ses-a_run-01",
        &json!({}),
        &Value::Null,
        &[json!({"raw": "recording", "ref": "sub-01_ses-a_run-01"})],
    );
    let poisoned = Artifact::new(&fingerprint, "filter", "sub-99_ses-a_run-01", json!({"x": 1}));
    ArtifactCache::open(cache_dir.path())
        .unwrap()
        .store(&poisoned)
        .unwrap();

    let (map, _) = stub_map(&["stub"]);
    let (summary, sink) = run_once(&config, &dataset, map, cache_dir.path()).await;

    assert!(summary.is_fatal());
    assert!(summary.fatal.as_deref().unwrap().contains("sub-99"));
    assert!(matches!(
        summary.outcomes.values().next().unwrap(),
        UnitOutcome::Fatal { .. }
    ));
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::FatalRaised { .. })),
        1
    );
}

#[tokio::test]
async fn substitution_and_omission_surface_as_warning_events() {
    let config = config_from(
        r#"
steps:
  - id: filter
    transform: stub
    inputs:
      - raw: recording
      - raw: chpi
        policy: omit_feature
  - id: maxwell
    transform: stub
    depends_on: [filter]
    inputs:
      - step: filter
      - raw: calibration
        policy: substitute_default
"#,
    );
    let dataset = dataset_from(
        r#"
subjects:
  - id: "01"
    sessions:
      - id: "a"
        runs: ["01"]
"#,
    );
    let cache_dir = tempfile::tempdir().unwrap();

    let (map, _) = stub_map(&["stub"]);
    let (summary, sink) = run_once(&config, &dataset, map, cache_dir.path()).await;

    // Degraded, not failed.
    assert_eq!(summary.succeeded_count(), 1);
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::FeatureOmitted { .. })),
        1
    );
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::SubstitutionApplied { .. })),
        1
    );
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::BranchFailed { .. })),
        0
    );
}
