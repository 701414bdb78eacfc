// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and event sinks.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus the [`messages::StructuredLog`] trait, so call
//! sites never format log strings by hand and field names stay stable
//! for downstream log processing.
//!
//! The engine itself emits [`crate::traits::PipelineEvent`] values
//! through an [`crate::traits::EventSink`]; the sinks in this module
//! render those events through the message types (for tracing output) or
//! collect them verbatim (for tests).

pub mod messages;
pub mod sinks;

pub use sinks::{CollectingSink, TracingSink};
