// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Messages are organized by subsystem:
//!
//! * `engine` - scheduler lifecycle and execution events
//! * `cache` - artifact cache hits, misses, and recovery
//! * `step` - per-step missing-optional-data conditions
//! * `index` - unit enumeration events
//! * `validation` - configuration validation warnings

pub mod cache;
pub mod engine;
pub mod index;
pub mod step;
pub mod validation;

/// Emit the message at its designated level with structured fields.
pub trait StructuredLog {
    fn log(&self);
}
