// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation for step graph integrity.
//!
//! Validation runs in a fixed order so error messages stay meaningful:
//!
//! 1. **Selection validation**: selection keywords must be `all`
//! 2. **Uniqueness validation**: step IDs must be unique
//! 3. **Input validation**: each declared input names exactly one source
//! 4. **Reference validation**: dependencies must point at declared steps
//! 5. **Ordering correction**: missing constraint edges are inserted
//! 6. **Cycle detection**: DFS with a recursion stack, reporting the path
//!
//! Reference validation must pass before cycle detection because the DFS
//! assumes a structurally valid graph. Ordering correction happens before
//! cycle detection so an auto-inserted edge that closes a cycle is still
//! caught.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::{Config, StepConfig};
use crate::errors::ValidationError;

/// Non-fatal validation findings. The configuration is usable after the
/// recorded correction has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// An ordering constraint held between two declared steps but the
    /// dependency edge was missing; it has been inserted.
    OrderingEdgeInserted { before: String, after: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::OrderingEdgeInserted { before, after } => {
                write!(
                    f,
                    "Inserted missing ordering edge: '{}' must run before '{}'",
                    before, after
                )
            }
        }
    }
}

/// Validate a configuration, applying ordering auto-corrections in place.
///
/// Returns the warnings for applied corrections, or every validation
/// error found. Constraints naming steps that are not declared are inert:
/// partial pipelines routinely omit whole stages.
pub fn validate_and_correct(
    config: &mut Config,
) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    validate_selections(config, &mut errors);
    validate_unique_ids(&config.steps, &mut errors);
    validate_input_sources(&config.steps, &mut errors);
    validate_references(&config.steps, &mut errors);

    if errors.is_empty() {
        apply_ordering_constraints(config, &mut warnings);
        if let Some(cycle) = find_cycle(&config.steps) {
            errors.push(ValidationError::CyclicDependency { cycle });
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}

fn validate_selections(config: &Config, errors: &mut Vec<ValidationError>) {
    use crate::config::Selection;

    for selection in [&config.subjects, &config.sessions, &config.runs] {
        if let Selection::Keyword(keyword) = selection {
            if keyword != "all" {
                errors.push(ValidationError::UnknownSelectionKeyword {
                    keyword: keyword.clone(),
                });
            }
        }
    }
}

fn validate_unique_ids(steps: &[StepConfig], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.id.as_str()) {
            errors.push(ValidationError::DuplicateStepId {
                step_id: step.id.clone(),
            });
        }
    }
}

fn validate_input_sources(steps: &[StepConfig], errors: &mut Vec<ValidationError>) {
    for step in steps {
        for input in &step.inputs {
            let sources = usize::from(input.step.is_some()) + usize::from(input.raw.is_some());
            if sources != 1 {
                errors.push(ValidationError::AmbiguousInputSource {
                    step_id: step.id.clone(),
                });
            }
        }
    }
}

fn validate_references(steps: &[StepConfig], errors: &mut Vec<ValidationError>) {
    let ids: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
    for step in steps {
        for dep in step.dependencies() {
            if !ids.contains(dep.as_str()) {
                errors.push(ValidationError::UnresolvedDependency {
                    step_id: step.id.clone(),
                    missing_dependency: dep,
                });
            }
        }
    }
}

/// Insert the dependency edge for every constraint whose two steps are
/// both declared but not yet ordered.
fn apply_ordering_constraints(config: &mut Config, warnings: &mut Vec<ValidationWarning>) {
    let ids: HashSet<String> = config.steps.iter().map(|s| s.id.clone()).collect();

    let constraints = config.ordering_constraints.clone();
    for constraint in constraints {
        if !ids.contains(&constraint.before) || !ids.contains(&constraint.after) {
            continue;
        }

        let after = config
            .steps
            .iter_mut()
            .find(|s| s.id == constraint.after)
            .expect("constraint target exists");

        if !after.dependencies().contains(&constraint.before) {
            after.depends_on.push(constraint.before.clone());
            warnings.push(ValidationWarning::OrderingEdgeInserted {
                before: constraint.before,
                after: constraint.after,
            });
        }
    }
}

/// DFS with a recursion stack; returns the cycle path when one exists.
fn find_cycle(steps: &[StepConfig]) -> Option<Vec<String>> {
    let graph: HashMap<&str, Vec<String>> = steps
        .iter()
        .map(|s| (s.id.as_str(), s.dependencies()))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut in_stack: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        node: &'a str,
        graph: &'a HashMap<&'a str, Vec<String>>,
        visited: &mut HashSet<&'a str>,
        in_stack: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        in_stack.insert(node);
        stack.push(node);

        if let Some(deps) = graph.get(node) {
            for dep in deps {
                if in_stack.contains(dep.as_str()) {
                    let start = stack.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                if !visited.contains(dep.as_str()) {
                    // Re-borrow the key so the recursion gets the graph's
                    // lifetime, not this loop's.
                    if let Some((dep_key, _)) = graph.get_key_value(dep.as_str()) {
                        if let Some(cycle) = visit(*dep_key, graph, visited, in_stack, stack) {
                            return Some(cycle);
                        }
                    }
                }
            }
        }

        in_stack.remove(node);
        stack.pop();
        None
    }

    for step in steps {
        if !visited.contains(step.id.as_str()) {
            if let Some(cycle) = visit(
                step.id.as_str(),
                &graph,
                &mut visited,
                &mut in_stack,
                &mut stack,
            ) {
                return Some(cycle);
            }
        }
    }
    None
}
