// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Persistent fingerprint-keyed artifact store.
//!
//! Layout: one JSON file per fingerprint under the cache root. Writes go
//! to a sibling temporary file first and are atomically renamed into
//! place, so a crashed or interrupted writer can never leave a
//! half-written entry that later reads as a hit. Reads revalidate the
//! artifact's content hash; an entry that fails to parse or verify is
//! removed and treated as a miss.
//!
//! Concurrency: `get_or_compute` holds a per-fingerprint async gate for
//! the duration of load-compute-store. Concurrent requests for the same
//! fingerprint converge on a single computation: the first caller
//! computes, the rest wait on the gate and then observe the stored
//! artifact. Requests for different fingerprints never contend beyond a
//! brief map lock.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::cache::artifact::Artifact;
use crate::cache::fingerprint::Fingerprint;
use crate::errors::{CacheError, ExecutionError};
use crate::observability::messages::cache::CorruptEntryRecovered;
use crate::observability::messages::StructuredLog;

/// How a `get_or_compute` request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// A valid entry existed; the transform did not run.
    Hit,
    /// No entry existed; the transform ran and its output was stored.
    Miss,
    /// An entry existed but was corrupt; it was discarded and recomputed.
    Recovered,
}

pub struct ArtifactCache {
    root: PathBuf,
    gates: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ArtifactCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            gates: StdMutex::new(HashMap::new()),
        })
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{}.json", fingerprint.as_hex()))
    }

    /// Load the entry for `fingerprint`, if a valid one exists.
    ///
    /// Returns `Err(CacheError::Corrupt)` for an entry that exists but
    /// cannot be trusted; callers decide whether to recover.
    pub fn load(&self, fingerprint: &Fingerprint) -> Result<Option<Artifact>, CacheError> {
        let path = self.entry_path(fingerprint);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let artifact: Artifact =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
                fingerprint: fingerprint.as_hex().to_string(),
                reason: format!("unparseable entry: {}", e),
            })?;

        if artifact.fingerprint != fingerprint.as_hex() {
            return Err(CacheError::Corrupt {
                fingerprint: fingerprint.as_hex().to_string(),
                reason: format!("entry records fingerprint {}", artifact.fingerprint),
            });
        }

        if !artifact.verify() {
            return Err(CacheError::Corrupt {
                fingerprint: fingerprint.as_hex().to_string(),
                reason: "content hash mismatch".to_string(),
            });
        }

        Ok(Some(artifact))
    }

    /// Persist an artifact: write to a temporary sibling, then rename.
    pub fn store(&self, artifact: &Artifact) -> Result<(), CacheError> {
        let path = self.root.join(format!("{}.json", artifact.fingerprint));
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(artifact).map_err(|e| {
            CacheError::Io(std::io::Error::new(ErrorKind::InvalidData, e.to_string()))
        })?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Remove the entry for `fingerprint`, if present.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> Result<(), CacheError> {
        match fs::remove_file(self.entry_path(fingerprint)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the cached artifact for `fingerprint`, computing and storing
    /// it if absent.
    ///
    /// At most one invocation of `compute` runs per fingerprint across the
    /// whole process; concurrent callers for the same fingerprint wait and
    /// reuse the stored result. A failed computation stores nothing, so a
    /// later request retries.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<(Artifact, CacheStatus), ExecutionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact, ExecutionError>>,
    {
        let gate = {
            let mut gates = self
                .gates
                .lock()
                .expect("cache gate map lock poisoned");
            gates
                .entry(fingerprint.as_hex().to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        let mut status = CacheStatus::Miss;
        match self.load(fingerprint) {
            Ok(Some(artifact)) => return Ok((artifact, CacheStatus::Hit)),
            Ok(None) => {}
            Err(CacheError::Corrupt {
                fingerprint: fp,
                reason,
            }) => {
                CorruptEntryRecovered {
                    fingerprint: &fp,
                    reason: &reason,
                }
                .log();
                self.invalidate(fingerprint)?;
                status = CacheStatus::Recovered;
            }
            Err(e) => return Err(e.into()),
        }

        let artifact = compute().await?;
        self.store(&artifact)?;
        Ok((artifact, status))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
