// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for artifact cache events.

use std::fmt::{Display, Formatter};

use crate::observability::messages::StructuredLog;

/// A step's output was served from the cache without recomputation.
///
/// # Log Level
/// `debug!` - High-volume diagnostic event
pub struct ArtifactCacheHit<'a> {
    pub unit: &'a str,
    pub step: &'a str,
    pub fingerprint: &'a str,
}

impl Display for ArtifactCacheHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cache hit for {} step '{}' ({})",
            self.unit, self.step, self.fingerprint
        )
    }
}

impl StructuredLog for ArtifactCacheHit<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            step = self.step,
            fingerprint = self.fingerprint,
            "{}", self
        );
    }
}

/// A step's output was absent; its transform executed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ArtifactCacheMiss<'a> {
    pub unit: &'a str,
    pub step: &'a str,
    pub fingerprint: &'a str,
}

impl Display for ArtifactCacheMiss<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cache miss for {} step '{}' ({})",
            self.unit, self.step, self.fingerprint
        )
    }
}

impl StructuredLog for ArtifactCacheMiss<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            step = self.step,
            fingerprint = self.fingerprint,
            "{}", self
        );
    }
}

/// A stored entry failed integrity checks and was discarded.
///
/// # Log Level
/// `warn!` - Recovered anomaly
pub struct CorruptEntryRecovered<'a> {
    pub fingerprint: &'a str,
    pub reason: &'a str,
}

impl Display for CorruptEntryRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Corrupt cache entry {} discarded ({}), recomputing",
            self.fingerprint, self.reason
        )
    }
}

impl StructuredLog for CorruptEntryRecovered<'_> {
    fn log(&self) {
        tracing::warn!(
            fingerprint = self.fingerprint,
            reason = self.reason,
            "{}", self
        );
    }
}
