// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors surfaced by the persistent artifact cache.
///
/// A `Corrupt` entry is never fatal: the cache treats it as a miss,
/// removes the entry, and recomputes. `Io` failures propagate to the
/// owning branch.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry for fingerprint {fingerprint}: {reason}")]
    Corrupt { fingerprint: String, reason: String },
}
