// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration validation warnings.

use std::fmt::{Display, Formatter};

use crate::observability::messages::StructuredLog;

/// An ordering constraint's dependency edge was missing and has been
/// inserted automatically.
///
/// # Log Level
/// `warn!` - Configuration corrected, review advised
pub struct OrderingEdgeInserted<'a> {
    pub before: &'a str,
    pub after: &'a str,
}

impl Display for OrderingEdgeInserted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Inserted ordering edge: '{}' must run before '{}'",
            self.before, self.after
        )
    }
}

impl StructuredLog for OrderingEdgeInserted<'_> {
    fn log(&self) {
        tracing::warn!(before = self.before, after = self.after, "{}", self);
    }
}
