// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Local (in-process) transform implementations.
//!
//! These are stand-ins for the numerical routines a production deployment
//! would call: they resolve their inputs, honor the plan-time mode tag,
//! and produce structured payloads, without touching real signal data.

mod average;
mod bandpass;
mod covariance;
mod epochs;
mod maxwell;

pub use average::AverageTransform;
pub use bandpass::BandpassTransform;
pub use covariance::CovarianceTransform;
pub use epochs::EpochsTransform;
pub use maxwell::MaxwellTransform;

use std::sync::Arc;

use crate::traits::transform::Transform;

/// Create a local transform instance by registry name.
pub fn create_transform(name: &str) -> Option<Arc<dyn Transform>> {
    match name {
        "bandpass" => Some(Arc::new(BandpassTransform::new())),
        "maxwell" => Some(Arc::new(MaxwellTransform::new())),
        "covariance" => Some(Arc::new(CovarianceTransform::new())),
        "epochs" => Some(Arc::new(EpochsTransform::new())),
        "average" => Some(Arc::new(AverageTransform::new())),
        _ => None,
    }
}
