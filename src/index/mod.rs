// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Unit enumeration.
//!
//! A dataset plus a configuration implies a multi-dimensional space of
//! processing units: subject x session x run x task. This module builds
//! that space, applies the configured include/exclude selections and the
//! missing-session tolerance policy, and computes the one-to-many join
//! between auxiliary (empty-room) recordings and the sessions that
//! consume them.

mod unit;

pub use unit::Unit;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::ConfigError;
use crate::observability::messages::index::MissingSessionDropped;
use crate::observability::messages::StructuredLog;
use crate::traits::dataset::{DatasetReader, RawInput};

/// One auxiliary (empty-room) recording context for a subject.
///
/// A subject has at most one such context per run of the pipeline; it is
/// matched to *every* session that carries an empty-room recording, so
/// downstream consumers fingerprint it once per session rather than
/// merging sessions into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryContext {
    pub subject: String,
    pub label: String,
}

impl AuxiliaryContext {
    fn for_subject(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            label: format!("sub-{}_task-noise", subject),
        }
    }
}

/// The enumerated unit space for one pipeline invocation.
///
/// Built once from the dataset scan and the configuration; immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct UnitIndex {
    units: Vec<Unit>,
    auxiliary: BTreeMap<Unit, AuxiliaryContext>,
}

impl UnitIndex {
    /// Enumerate units and match auxiliary recordings.
    ///
    /// Fails with `ConfigError::NoSubjects` when the subject dimension is
    /// wholly absent after filtering; merely optional missing dimensions
    /// (sessions, runs, calibration files) never fail enumeration.
    pub fn build(reader: &dyn DatasetReader, config: &Config) -> Result<Self, ConfigError> {
        let units = enumerate_units(reader, config)?;
        let auxiliary = match_auxiliary(reader, config, &units);
        Ok(Self { units, auxiliary })
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The auxiliary recording context matched to this unit, if any.
    pub fn auxiliary_for(&self, unit: &Unit) -> Option<&AuxiliaryContext> {
        self.auxiliary.get(unit)
    }

    pub fn auxiliary(&self) -> &BTreeMap<Unit, AuxiliaryContext> {
        &self.auxiliary
    }
}

/// Cartesian product of subjects x sessions x runs, filtered by the
/// configured selections.
///
/// Sessions a subject lacks are absent from the result either way; with
/// `allow_missing_sessions` disabled each dropped (subject, session) pair
/// is surfaced as a warning so ragged designs are visible, while the
/// tolerant mode stays quiet and defers to per-step input policies.
fn enumerate_units(
    reader: &dyn DatasetReader,
    config: &Config,
) -> Result<Vec<Unit>, ConfigError> {
    let subjects: Vec<String> = reader
        .subjects()
        .into_iter()
        .filter(|s| config.subjects.includes(s))
        .filter(|s| !config.exclude_subjects.contains(s))
        .collect();

    if subjects.is_empty() {
        return Err(ConfigError::NoSubjects);
    }

    // Union of sessions across selected subjects, used to detect ragged
    // session sets.
    let session_union: BTreeSet<String> = subjects
        .iter()
        .flat_map(|s| reader.sessions(s))
        .filter(|ses| config.sessions.includes(ses))
        .collect();

    let mut units = Vec::new();
    for subject in &subjects {
        let own_sessions: Vec<String> = reader
            .sessions(subject)
            .into_iter()
            .filter(|ses| config.sessions.includes(ses))
            .collect();

        if !config.allow_missing_sessions {
            for missing in session_union.iter().filter(|s| !own_sessions.contains(*s)) {
                MissingSessionDropped {
                    subject,
                    session: missing,
                }
                .log();
            }
        }

        let session_slots: Vec<Option<String>> = if own_sessions.is_empty() {
            vec![None]
        } else {
            own_sessions.into_iter().map(Some).collect()
        };

        for session in session_slots {
            let runs: Vec<String> = reader
                .runs(subject, session.as_deref())
                .into_iter()
                .filter(|run| config.runs.includes(run))
                .collect();

            let run_slots: Vec<Option<String>> = if runs.is_empty() {
                vec![None]
            } else {
                runs.into_iter().map(Some).collect()
            };

            for run in run_slots {
                units.push(Unit {
                    subject: subject.clone(),
                    session: session.clone(),
                    run,
                    task: config.task.clone(),
                });
            }
        }
    }

    Ok(units)
}

/// One-to-many join from a subject's auxiliary recording to every unit
/// whose session carries one.
///
/// The context is shared (same label) across a subject's sessions, but it
/// is attached per unit, so each consuming session produces its own
/// downstream fingerprints.
fn match_auxiliary(
    reader: &dyn DatasetReader,
    config: &Config,
    units: &[Unit],
) -> BTreeMap<Unit, AuxiliaryContext> {
    let mut matched = BTreeMap::new();
    if !config.process_empty_room {
        return matched;
    }

    for unit in units {
        if reader.has_input(unit, RawInput::EmptyRoom) {
            matched.insert(unit.clone(), AuxiliaryContext::for_subject(&unit.subject));
        }
    }

    matched
}
