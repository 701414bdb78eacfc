// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-step missing-optional-data conditions.
//!
//! None of these are errors: each records a policy decision that let a
//! step proceed without an optional resource.

use std::fmt::{Display, Formatter};

use crate::observability::messages::StructuredLog;

/// A missing resource was replaced by its built-in default.
///
/// # Log Level
/// `warn!` - Degraded but proceeding
pub struct SubstitutionApplied<'a> {
    pub unit: &'a str,
    pub step: &'a str,
    pub input: &'a str,
}

impl Display for SubstitutionApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} step '{}': '{}' missing, using built-in default",
            self.unit, self.step, self.input
        )
    }
}

impl StructuredLog for SubstitutionApplied<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            step = self.step,
            input = self.input,
            "{}", self
        );
    }
}

/// A missing optional feature was dropped from the invocation.
///
/// # Log Level
/// `warn!` - Degraded but proceeding
pub struct FeatureOmitted<'a> {
    pub unit: &'a str,
    pub step: &'a str,
    pub input: &'a str,
}

impl Display for FeatureOmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} step '{}': '{}' absent, running reduced form",
            self.unit, self.step, self.input
        )
    }
}

impl StructuredLog for FeatureOmitted<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            step = self.step,
            input = self.input,
            "{}", self
        );
    }
}

/// A step was re-parameterized against the available channel types.
///
/// # Log Level
/// `warn!` - Degraded but proceeding
pub struct ScopeNarrowed<'a> {
    pub unit: &'a str,
    pub step: &'a str,
    pub available: &'a str,
}

impl Display for ScopeNarrowed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} step '{}': narrowed to available channel types [{}]",
            self.unit, self.step, self.available
        )
    }
}

impl StructuredLog for ScopeNarrowed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            step = self.step,
            available = self.available,
            "{}", self
        );
    }
}
