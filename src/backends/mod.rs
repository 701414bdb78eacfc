// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod factory;
pub mod local;
pub mod manifest;
pub mod stub;

pub use factory::build_transform_map;
pub use manifest::ManifestDataset;
