// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::CliError;
use gmv_preprocess::NormalizerConfig;
use gmv_validate::ValidationConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Settings file accepted by `--config`. Every section and field is optional,
/// unknown keys are rejected at every level, and command-line flags override
/// what the file sets.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub validation: Option<ValidationConfig>,
    pub normalize: Option<NormalizerConfig>,
}

pub fn parse_config(raw: &str) -> Result<FileConfig, CliError> {
    serde_json::from_str(raw).map_err(|source| CliError::json("invalid config JSON", source))
}

pub fn load_config(path: &Path) -> Result<FileConfig, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    serde_json::from_str(raw.as_str())
        .map_err(|source| CliError::json(format!("invalid JSON in '{}'", path.display()), source))
}

#[cfg(test)]
mod tests {
    use super::parse_config;
    use gmv_align::LagMode;
    use gmv_preprocess::{BoundaryPolicy, NormalizerConfig};
    use gmv_validate::{ArtifactPolicy, ValidationConfig};

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let config = parse_config(
            r#"{
              "validation": {"threshold": 0.95, "lag_mode": "linear"},
              "normalize": {"period": 5, "boundary": "leading_sample"}
            }"#,
        )
        .expect("config should parse");

        let validation = config.validation.expect("validation section");
        assert_eq!(validation.threshold, 0.95);
        assert_eq!(validation.lag_mode, LagMode::Linear);
        assert_eq!(validation.artifacts, ArtifactPolicy::OnFailure);

        let normalize = config.normalize.expect("normalize section");
        assert_eq!(normalize.period, 5);
        assert_eq!(normalize.boundary, BoundaryPolicy::LeadingSample);
        assert_eq!(normalize.step, NormalizerConfig::default().step);
    }

    #[test]
    fn empty_document_has_no_sections() {
        let config = parse_config("{}").expect("empty config should parse");
        assert!(config.validation.is_none());
        assert!(config.normalize.is_none());
        assert_eq!(
            config.validation.unwrap_or_default(),
            ValidationConfig::default()
        );
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = parse_config(r#"{"validate": {}}"#).expect_err("typo must fail");
        assert_eq!(err.code(), "json_error");
    }

    #[test]
    fn unknown_fields_inside_sections_are_rejected() {
        let err = parse_config(r#"{"validation": {"treshold": 0.5}}"#)
            .expect_err("misspelled validation field must fail");
        assert_eq!(err.code(), "json_error");
        assert!(err.to_string().contains("treshold"), "{err}");

        let err = parse_config(r#"{"normalize": {"period": 5, "stepsize": 0.1}}"#)
            .expect_err("misspelled normalize field must fail");
        assert_eq!(err.code(), "json_error");
        assert!(err.to_string().contains("stepsize"), "{err}");
    }
}
