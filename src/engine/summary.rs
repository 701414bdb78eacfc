use std::collections::BTreeMap;
use std::fmt;

use crate::index::Unit;

/// Outcome of one unit's plan execution.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// Every planned step completed; fingerprints keyed by step ID.
    Success { artifacts: BTreeMap<String, String> },
    /// A branch failed; its dependents were not run, the rest completed.
    PartialFailure {
        completed: Vec<String>,
        failed_step: String,
        reason: String,
    },
    /// The unit was stopped by a run-level fatal condition.
    Fatal { reason: String },
}

impl UnitOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, UnitOutcome::Success { .. })
    }
}

/// Per-unit outcomes for one scheduler invocation, plus the fatal reason
/// when the whole run was halted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub outcomes: BTreeMap<Unit, UnitOutcome>,
    pub fatal: Option<String>,
}

impl RunSummary {
    pub fn outcome(&self, unit: &Unit) -> Option<&UnitOutcome> {
        self.outcomes.get(unit)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.succeeded()).count()
    }

    pub fn partial_failure_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, UnitOutcome::PartialFailure { .. }))
            .count()
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (unit, outcome) in &self.outcomes {
            match outcome {
                UnitOutcome::Success { artifacts } => {
                    writeln!(f, "  ok      {} ({} steps)", unit, artifacts.len())?;
                }
                UnitOutcome::PartialFailure {
                    completed,
                    failed_step,
                    reason,
                } => {
                    writeln!(
                        f,
                        "  partial {} failed at '{}' after {} step(s): {}",
                        unit,
                        failed_step,
                        completed.len(),
                        reason
                    )?;
                }
                UnitOutcome::Fatal { reason } => {
                    writeln!(f, "  halted  {}: {}", unit, reason)?;
                }
            }
        }
        if let Some(reason) = &self.fatal {
            writeln!(f, "  FATAL: {}", reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(subject: &str) -> Unit {
        Unit {
            subject: subject.into(),
            session: None,
            run: None,
            task: None,
        }
    }

    #[test]
    fn counts_distinguish_outcome_kinds() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            unit("01"),
            UnitOutcome::Success {
                artifacts: BTreeMap::new(),
            },
        );
        outcomes.insert(
            unit("02"),
            UnitOutcome::PartialFailure {
                completed: vec!["filter".into()],
                failed_step: "maxwell".into(),
                reason: "required input 'calibration' missing".into(),
            },
        );

        let summary = RunSummary {
            outcomes,
            fatal: None,
        };
        assert_eq!(summary.succeeded_count(), 1);
        assert_eq!(summary.partial_failure_count(), 1);
        assert!(!summary.is_fatal());

        let rendered = summary.to_string();
        assert!(rendered.contains("sub-02"));
        assert!(rendered.contains("maxwell"));
    }
}
