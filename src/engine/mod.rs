pub mod plan;
pub mod scheduler;
pub mod summary;
#[cfg(test)]
pub mod integration_tests;

pub use plan::{build_plan, ExecutionPlan, InputResolution, PlannedStep, PrunedStep, StepMode};
pub use scheduler::Scheduler;
pub use summary::{RunSummary, UnitOutcome};
