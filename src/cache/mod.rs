// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content-addressed artifact caching.
//!
//! Every step invocation is identified by a [`Fingerprint`]: a
//! deterministic hash over the step identity, the unit, the allow-listed
//! configuration slice, the passthrough options, and the ordered digests
//! of the step's resolved inputs. The [`ArtifactCache`] maps fingerprints
//! to materialized [`Artifact`]s on disk, guaranteeing at-most-once
//! computation per fingerprint across concurrently scheduled units and
//! surviving process restarts.

mod artifact;
mod canonical;
mod fingerprint;
mod store;

pub use artifact::Artifact;
pub use canonical::{hash_value, to_canonical_json};
pub use fingerprint::{step_fingerprint, Fingerprint};
pub use store::{ArtifactCache, CacheStatus};
