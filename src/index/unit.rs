use std::fmt;

use serde::{Deserialize, Serialize};

/// One schedulable (subject, session, run, task) combination.
///
/// Session, run, and task are optional dimensions; whether they are
/// populated depends on the dataset design. Units are created once per
/// pipeline invocation and never mutated.
///
/// # Examples
///
/// ```
/// use neuropipe::index::Unit;
///
/// let unit = Unit {
///     subject: "01".into(),
///     session: Some("meg".into()),
///     run: Some("02".into()),
///     task: Some("facerecognition".into()),
/// };
/// assert_eq!(unit.label(), "sub-01_ses-meg_task-facerecognition_run-02");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unit {
    pub subject: String,
    pub session: Option<String>,
    pub run: Option<String>,
    pub task: Option<String>,
}

impl Unit {
    /// The unit's canonical label, entity order matching the standard
    /// file-naming scheme: subject, session, task, run.
    pub fn label(&self) -> String {
        let mut label = format!("sub-{}", self.subject);
        if let Some(session) = &self.session {
            label.push_str(&format!("_ses-{}", session));
        }
        if let Some(task) = &self.task {
            label.push_str(&format!("_task-{}", task));
        }
        if let Some(run) = &self.run {
            label.push_str(&format!("_run-{}", run));
        }
        label
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
