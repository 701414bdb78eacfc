// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during step graph validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A circular dependency was detected in the step graph
    CyclicDependency {
        /// The cycle path showing the circular dependency
        cycle: Vec<String>,
    },
    /// A step references a dependency that doesn't exist
    UnresolvedDependency {
        /// The step that has the unresolved dependency
        step_id: String,
        /// The dependency that couldn't be resolved
        missing_dependency: String,
    },
    /// A step has a duplicate ID
    DuplicateStepId {
        /// The duplicate step ID
        step_id: String,
    },
    /// A declared input names both a step and a raw category, or neither
    AmbiguousInputSource {
        /// The step whose input declaration is ambiguous
        step_id: String,
    },
    /// A selection keyword other than "all" was used
    UnknownSelectionKeyword {
        /// The offending keyword
        keyword: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::UnresolvedDependency {
                step_id,
                missing_dependency,
            } => {
                write!(
                    f,
                    "Step '{}' depends on '{}' which does not exist",
                    step_id, missing_dependency
                )
            }
            ValidationError::DuplicateStepId { step_id } => {
                write!(f, "Duplicate step ID: '{}'", step_id)
            }
            ValidationError::AmbiguousInputSource { step_id } => {
                write!(
                    f,
                    "Step '{}' declares an input that must name exactly one of 'step' or 'raw'",
                    step_id
                )
            }
            ValidationError::UnknownSelectionKeyword { keyword } => {
                write!(
                    f,
                    "Unknown selection keyword '{}' (expected \"all\" or an explicit list)",
                    keyword
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised before scheduling begins: unreadable or invalid
/// configuration, empty unit selections, unknown transform names.
/// Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("configuration validation failed with {} error(s)", .errors.len())]
    Invalid { errors: Vec<ValidationError> },

    #[error("no subjects remain after applying subject selections")]
    NoSubjects,

    #[error("step '{step_id}' names unknown transform '{transform}'")]
    UnknownTransform { step_id: String, transform: String },
}
