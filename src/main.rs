// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use neuropipe::backends::{build_transform_map, ManifestDataset};
use neuropipe::cache::ArtifactCache;
use neuropipe::config::{load_and_validate_config, StepGraph};
use neuropipe::engine::{RunSummary, Scheduler};
use neuropipe::index::UnitIndex;
use neuropipe::observability::TracingSink;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <config.yaml> <dataset.yaml>", args[0]);
        eprintln!("Example: {} configs/meg-pipeline.yaml dataset.yaml", args[0]);
        return ExitCode::FAILURE;
    }

    match run(&args[1], &args[2]).await {
        Ok(summary) if summary.is_fatal() => {
            eprintln!(
                "Run halted: {}",
                summary.fatal.as_deref().unwrap_or("unknown fatal error")
            );
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str, dataset_path: &str) -> anyhow::Result<RunSummary> {
    let config = load_and_validate_config(config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    let dataset = ManifestDataset::from_yaml_file(dataset_path)
        .with_context(|| format!("loading dataset manifest from {}", dataset_path))?;

    let index = UnitIndex::build(&dataset, &config).context("enumerating units")?;
    let transforms = build_transform_map(&config).context("building transform registry")?;
    let graph = StepGraph::from_config(&config)
        .context("step graph contains a cycle (should have been caught during validation)")?;
    let cache = ArtifactCache::open(&config.cache_root)
        .with_context(|| format!("opening cache at {}", config.cache_root.display()))?;

    println!("neuropipe: {} units, {} steps", index.len(), graph.len());

    let scheduler = Scheduler::from_config(&config);
    let started = Instant::now();
    let summary = scheduler
        .run(
            &index,
            Arc::new(graph),
            transforms,
            Arc::new(dataset),
            Arc::new(cache),
            Arc::new(TracingSink::new()),
            Arc::new(config),
        )
        .await;

    println!(
        "finished in {:.2?}: {} succeeded, {} partial",
        started.elapsed(),
        summary.succeeded_count(),
        summary.partial_failure_count()
    );
    print!("{}", summary);

    Ok(summary)
}
