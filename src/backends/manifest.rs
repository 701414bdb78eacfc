// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Manifest-backed dataset reader.
//!
//! A YAML manifest describes the dataset's structure: which subjects,
//! sessions, and runs exist, and which optional resources (calibration,
//! cross-talk, empty-room recordings, cHPI channels) are present. This is
//! the structural metadata the engine probes; actual recording contents
//! stay behind the transforms.
//!
//! ```yaml
//! subjects:
//!   - id: "01"
//!     has_calibration: true
//!     has_cross_talk: true
//!     sessions:
//!       - id: "meg"
//!         runs: ["01", "02"]
//!         has_chpi: true
//!         has_empty_room: true
//!         channel_types: [mag, grad]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::index::Unit;
use crate::traits::dataset::{ChannelType, DatasetReader, RawInput};

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestDataset {
    #[serde(default)]
    pub subjects: Vec<SubjectManifest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectManifest {
    pub id: String,
    #[serde(default)]
    pub has_calibration: bool,
    #[serde(default)]
    pub has_cross_talk: bool,
    #[serde(default)]
    pub sessions: Vec<SessionManifest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionManifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub runs: Vec<String>,
    #[serde(default)]
    pub has_chpi: bool,
    #[serde(default)]
    pub has_empty_room: bool,
    #[serde(default = "default_channel_types")]
    pub channel_types: Vec<ChannelType>,
}

fn default_channel_types() -> Vec<ChannelType> {
    vec![ChannelType::Mag, ChannelType::Grad]
}

impl ManifestDataset {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: "<inline manifest>".into(),
            message: e.to_string(),
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn subject(&self, id: &str) -> Option<&SubjectManifest> {
        self.subjects.iter().find(|s| s.id == id)
    }

    fn session(&self, unit: &Unit) -> Option<&SessionManifest> {
        self.subject(&unit.subject)?
            .sessions
            .iter()
            .find(|s| s.id.as_deref() == unit.session.as_deref())
    }
}

impl DatasetReader for ManifestDataset {
    fn subjects(&self) -> Vec<String> {
        self.subjects.iter().map(|s| s.id.clone()).collect()
    }

    fn sessions(&self, subject: &str) -> Vec<String> {
        self.subject(subject)
            .map(|s| s.sessions.iter().filter_map(|ses| ses.id.clone()).collect())
            .unwrap_or_default()
    }

    fn runs(&self, subject: &str, session: Option<&str>) -> Vec<String> {
        self.subject(subject)
            .and_then(|s| {
                s.sessions
                    .iter()
                    .find(|ses| ses.id.as_deref() == session)
                    .map(|ses| ses.runs.clone())
            })
            .unwrap_or_default()
    }

    fn has_input(&self, unit: &Unit, input: RawInput) -> bool {
        match input {
            RawInput::Recording => {
                let Some(session) = self.session(unit) else {
                    return false;
                };
                match &unit.run {
                    Some(run) => session.runs.contains(run),
                    None => session.runs.is_empty(),
                }
            }
            RawInput::Calibration => self
                .subject(&unit.subject)
                .map(|s| s.has_calibration)
                .unwrap_or(false),
            RawInput::CrossTalk => self
                .subject(&unit.subject)
                .map(|s| s.has_cross_talk)
                .unwrap_or(false),
            RawInput::EmptyRoom => self
                .session(unit)
                .map(|s| s.has_empty_room)
                .unwrap_or(false),
            RawInput::Chpi => self.session(unit).map(|s| s.has_chpi).unwrap_or(false),
            RawInput::ChannelTypes => self
                .session(unit)
                .map(|s| !s.channel_types.is_empty())
                .unwrap_or(false),
        }
    }

    fn channel_types(&self, unit: &Unit) -> Vec<ChannelType> {
        self.session(unit)
            .map(|s| s.channel_types.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(subject: &str, session: Option<&str>, run: Option<&str>) -> Unit {
        Unit {
            subject: subject.into(),
            session: session.map(String::from),
            run: run.map(String::from),
            task: None,
        }
    }

    #[test]
    fn presence_probes_follow_the_manifest() {
        let dataset = ManifestDataset::from_yaml(
            r#"
subjects:
  - id: "01"
    has_calibration: true
    sessions:
      - id: "a"
        runs: ["01"]
        has_chpi: true
        channel_types: [mag]
"#,
        )
        .unwrap();

        let u = unit("01", Some("a"), Some("01"));
        assert!(dataset.has_input(&u, RawInput::Recording));
        assert!(dataset.has_input(&u, RawInput::Calibration));
        assert!(!dataset.has_input(&u, RawInput::CrossTalk));
        assert!(dataset.has_input(&u, RawInput::Chpi));
        assert!(!dataset.has_input(&u, RawInput::EmptyRoom));
        assert_eq!(dataset.channel_types(&u), vec![ChannelType::Mag]);

        let absent_run = unit("01", Some("a"), Some("99"));
        assert!(!dataset.has_input(&absent_run, RawInput::Recording));
    }

    #[test]
    fn sessionless_manifest_resolves_through_null_session() {
        let dataset = ManifestDataset::from_yaml(
            r#"
subjects:
  - id: "01"
    sessions:
      - runs: ["01"]
"#,
        )
        .unwrap();

        assert!(dataset.sessions("01").is_empty());
        assert_eq!(dataset.runs("01", None), vec!["01"]);
        assert!(dataset.has_input(&unit("01", None, Some("01")), RawInput::Recording));
    }
}
