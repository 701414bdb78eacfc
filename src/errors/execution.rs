// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::CacheError;

/// Errors raised while executing a unit's plan.
///
/// `TransformFailed` and `Cache` are branch-local: they mark one
/// (unit, step) pair and its dependents as failed without touching
/// sibling units. `InvariantViolation` is a correctness hazard spanning
/// units and halts the whole run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("transform '{transform}' failed for step '{step}': {message}")]
    TransformFailed {
        step: String,
        transform: String,
        message: String,
    },

    #[error("artifact identity mismatch: expected '{expected}', found '{found}'")]
    InvariantViolation { expected: String, found: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ExecutionError {
    /// Whether this error must halt the entire run rather than a single branch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionError::InvariantViolation { .. })
    }
}
