pub mod dataset;
pub mod events;
pub mod transform;

pub use dataset::{ChannelType, DatasetReader, RawInput};
pub use events::{EventSink, PipelineEvent};
pub use transform::{Transform, TransformInput, TransformOutcome, TransformRequest, TransformResponse};

pub use crate::config::TransformMap;
