// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for unit enumeration events.

use std::fmt::{Display, Formatter};

use crate::observability::messages::StructuredLog;

/// A subject lacks a session other subjects have; the pair was dropped.
///
/// # Log Level
/// `warn!` - Ragged design made visible
pub struct MissingSessionDropped<'a> {
    pub subject: &'a str,
    pub session: &'a str,
}

impl Display for MissingSessionDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subject '{}' has no session '{}'; dropping that combination",
            self.subject, self.session
        )
    }
}

impl StructuredLog for MissingSessionDropped<'_> {
    fn log(&self) {
        tracing::warn!(subject = self.subject, session = self.session, "{}", self);
    }
}
