// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod step_graph;
mod transform_map;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, Config, ExecutorOptions, InputConfig, InputPolicy,
    OrderingConstraint, Selection, StepConfig, StepScope,
};
pub use step_graph::StepGraph;
pub use transform_map::TransformMap;
pub use validation::{validate_and_correct, ValidationWarning};
