// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for scheduler lifecycle and execution events.

use std::fmt::{Display, Formatter};

use crate::observability::messages::StructuredLog;

/// Scheduling started for an enumerated unit set.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted {
    pub unit_count: usize,
    pub step_count: usize,
    pub max_concurrency: usize,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting pipeline run: {} units x {} steps, max_concurrency={}",
            self.unit_count, self.step_count, self.max_concurrency
        )
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::info!(
            unit_count = self.unit_count,
            step_count = self.step_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }
}

/// A unit's plan execution began.
///
/// # Log Level
/// `info!` - Important operational event
pub struct UnitStarted<'a> {
    pub unit: &'a str,
}

impl Display for UnitStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unit {} started", self.unit)
    }
}

impl StructuredLog for UnitStarted<'_> {
    fn log(&self) {
        tracing::info!(unit = self.unit, "{}", self);
    }
}

/// A unit's plan execution finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct UnitCompleted<'a> {
    pub unit: &'a str,
    pub succeeded: bool,
}

impl Display for UnitCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit {} {}",
            self.unit,
            if self.succeeded {
                "completed"
            } else {
                "finished with failures"
            }
        )
    }
}

impl StructuredLog for UnitCompleted<'_> {
    fn log(&self) {
        tracing::info!(unit = self.unit, succeeded = self.succeeded, "{}", self);
    }
}

/// One (unit, step) branch failed; its dependents will not run.
///
/// # Log Level
/// `warn!` - Isolated failure, run continues
pub struct UnitBranchFailed<'a> {
    pub unit: &'a str,
    pub step: &'a str,
    pub reason: &'a str,
}

impl Display for UnitBranchFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Branch failed for {} at step '{}': {}",
            self.unit, self.step, self.reason
        )
    }
}

impl StructuredLog for UnitBranchFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            step = self.step,
            reason = self.reason,
            "{}", self
        );
    }
}

/// A run-level correctness hazard was detected; the run is halting.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct FatalErrorRaised<'a> {
    pub reason: &'a str,
}

impl Display for FatalErrorRaised<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Fatal error, halting run: {}", self.reason)
    }
}

impl StructuredLog for FatalErrorRaised<'_> {
    fn log(&self) {
        tracing::error!(reason = self.reason, "{}", self);
    }
}
