// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // transform backends + dataset manifests
pub mod cache;      // fingerprints + persistent artifact store
pub mod config;     // config + step graph
pub mod engine;     // per-unit planning and scheduling
pub mod errors;     // error handling
pub mod index;      // unit enumeration
pub mod observability;
pub mod traits;     // unified abstractions
