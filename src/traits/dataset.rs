use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::Unit;

/// Per-unit raw data categories the engine can probe for presence.
///
/// The engine only ever asks the dataset reader *whether* one of these
/// exists for a unit; interpreting the underlying file contents is the
/// job of the transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawInput {
    /// The per-run recording itself
    Recording,
    /// Fine-calibration file (site-specific, often missing)
    Calibration,
    /// Cross-talk correction file
    CrossTalk,
    /// Auxiliary empty-room noise recording
    EmptyRoom,
    /// Continuous head-position-indicator channels
    Chpi,
    /// The set of sensor channel types present in the recording
    ChannelTypes,
}

impl RawInput {
    /// Stable name used in fingerprints, events, and log output.
    pub fn name(&self) -> &'static str {
        match self {
            RawInput::Recording => "recording",
            RawInput::Calibration => "calibration",
            RawInput::CrossTalk => "cross_talk",
            RawInput::EmptyRoom => "empty_room",
            RawInput::Chpi => "chpi",
            RawInput::ChannelTypes => "channel_types",
        }
    }

    /// Built-in stand-in payload used by the substitute-default policy.
    pub fn builtin_default(&self) -> serde_json::Value {
        serde_json::json!({
            "resource": self.name(),
            "source": "builtin-default",
        })
    }
}

impl fmt::Display for RawInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensor channel types a recording can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Mag,
    Grad,
    Eeg,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Mag => f.write_str("mag"),
            ChannelType::Grad => f.write_str("grad"),
            ChannelType::Eeg => f.write_str("eeg"),
        }
    }
}

/// Read-only view of a dataset's structure.
///
/// Implementations answer which subjects/sessions/runs exist and which
/// optional raw inputs are present for a given unit. The engine never asks
/// a reader to interpret numerical contents.
pub trait DatasetReader: Send + Sync {
    /// All subject identifiers in the dataset.
    fn subjects(&self) -> Vec<String>;

    /// Session identifiers for one subject. Empty for sessionless datasets.
    fn sessions(&self, subject: &str) -> Vec<String>;

    /// Run identifiers for one (subject, session). Empty when the dataset
    /// has no run dimension.
    fn runs(&self, subject: &str, session: Option<&str>) -> Vec<String>;

    /// Whether the given raw input category exists for the unit.
    fn has_input(&self, unit: &Unit, input: RawInput) -> bool;

    /// Channel types present in the unit's recording.
    fn channel_types(&self, unit: &Unit) -> Vec<ChannelType>;
}
