// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use crate::traits::transform::{Transform, TransformInput, TransformRequest, TransformResponse};

/// A stub transform for testing and placeholder purposes.
///
/// Counts its executions so tests can assert how often the cache actually
/// invoked it; the payload is a pure function of the request, keeping
/// repeated runs bit-for-bit identical.
pub struct StubTransform {
    pub id: String,
    executions: Arc<AtomicUsize>,
}

impl StubTransform {
    pub fn new(id: String) -> Self {
        Self {
            id,
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared execution counter, usable after the transform moves into
    /// the registry.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.executions.clone()
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transform for StubTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        self.executions.fetch_add(1, Ordering::SeqCst);

        let input_refs: Vec<String> = req
            .inputs
            .iter()
            .map(|input| match input {
                TransformInput::Artifact(artifact) => format!("artifact:{}", artifact.step),
                TransformInput::Raw { reference, .. } => format!("raw:{}", reference),
                TransformInput::Default { category, .. } => format!("default:{}", category),
            })
            .collect();

        TransformResponse::payload(json!({
            "stub": self.id,
            "unit": req.unit.label(),
            "inputs": input_refs,
        }))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// A transform that always fails, for exercising failure scenarios.
pub struct FailingTransform {
    pub id: String,
}

impl FailingTransform {
    pub fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait::async_trait]
impl Transform for FailingTransform {
    async fn apply(&self, _req: TransformRequest) -> TransformResponse {
        TransformResponse::error(format!("injected failure in '{}'", self.id))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// A transform that blocks until released, for exercising concurrency.
pub struct SlowTransform {
    pub delay: std::time::Duration,
    executions: Arc<AtomicUsize>,
}

impl SlowTransform {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            delay,
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.executions.clone()
    }
}

#[async_trait::async_trait]
impl Transform for SlowTransform {
    async fn apply(&self, req: TransformRequest) -> TransformResponse {
        self.executions.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        TransformResponse::payload(json!({ "slow": req.unit.label() }))
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}
