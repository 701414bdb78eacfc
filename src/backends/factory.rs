// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{Config, TransformMap};
use crate::errors::ConfigError;

use super::local;

/// Build the transform registry the configuration's steps require.
///
/// Every distinct transform name is instantiated once and shared by all
/// steps that reference it; an unknown name aborts before scheduling.
pub fn build_transform_map(config: &Config) -> Result<TransformMap, ConfigError> {
    let mut map = TransformMap::new();
    for step in &config.steps {
        if map.contains_key(&step.transform) {
            continue;
        }
        let transform =
            local::create_transform(&step.transform).ok_or_else(|| ConfigError::UnknownTransform {
                step_id: step.id.clone(),
                transform: step.transform.clone(),
            })?;
        map.insert(step.transform.clone(), transform);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_transforms_build_one_instance_each() {
        let config: Config = serde_yaml::from_str(
            r#"
steps:
  - id: filter_a
    transform: bandpass
  - id: filter_b
    transform: bandpass
  - id: cov
    transform: covariance
"#,
        )
        .unwrap();

        let map = build_transform_map(&config).unwrap();
        let mut ids: Vec<&String> = map.keys().collect();
        ids.sort();
        assert_eq!(ids, vec!["bandpass", "covariance"]);
    }

    #[test]
    fn unknown_transform_is_a_config_error() {
        let config: Config = serde_yaml::from_str(
            r#"
steps:
  - id: beamform
    transform: lcmv
"#,
        )
        .unwrap();

        assert!(matches!(
            build_transform_map(&config),
            Err(ConfigError::UnknownTransform { transform, .. }) if transform == "lcmv"
        ));
    }
}
