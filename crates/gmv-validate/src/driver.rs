// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::report::{FailureArtifacts, Truncation, ValidationReport};
use gmv_align::{LagMode, align, detect_lag_with, score};
use gmv_core::{Diagnostics, ExecutionContext, GmvError, SignalView};
use std::time::Instant;

/// Default pass threshold on the correlation coefficient.
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// When the report carries copies of the compared traces.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArtifactPolicy {
    #[default]
    OnFailure,
    Always,
    Never,
}

impl ArtifactPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnFailure => "on_failure",
            Self::Always => "always",
            Self::Never => "never",
        }
    }

    fn wants(self, passed: bool) -> bool {
        match self {
            Self::OnFailure => !passed,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Validation driver configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValidationConfig {
    /// A run passes when `score >= threshold`.
    pub threshold: f64,
    pub lag_mode: LagMode,
    pub artifacts: ArtifactPolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            lag_mode: LagMode::Cyclic,
            artifacts: ArtifactPolicy::OnFailure,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), GmvError> {
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(GmvError::invalid_input(format!(
                "validation threshold must be finite and within [-1, 1]; got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Compares a candidate trace with a reference trace: truncate to a common
/// length, detect the lag, align, then score the overlap.
#[derive(Clone, Debug, PartialEq)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Result<Self, GmvError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn run(
        &self,
        candidate: &SignalView<'_>,
        reference: &SignalView<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ValidationReport, GmvError> {
        let started_at = Instant::now();
        let mut diagnostics = Diagnostics::for_algorithm("lag_correlation");

        let truncation = Truncation::between(candidate.len(), reference.len());
        let (candidate, reference) = match truncation {
            Some(t) => {
                diagnostics.warn(format!(
                    "inputs truncated to {} samples (candidate_len={}, reference_len={})",
                    t.retained_len, t.candidate_len, t.reference_len
                ));
                tracing::warn!(
                    candidate_len = t.candidate_len,
                    reference_len = t.reference_len,
                    retained_len = t.retained_len,
                    "length mismatch; keeping the leading samples of each input"
                );
                (
                    candidate.truncate(t.retained_len)?,
                    reference.truncate(t.retained_len)?,
                )
            }
            None => (*candidate, *reference),
        };
        ctx.report_progress(0.1);

        let lag = detect_lag_with(&candidate, &reference, self.config.lag_mode)?;
        ctx.record_scalar("validate.lag", lag as f64);
        ctx.report_progress(0.6);

        let pair = align(&candidate, &reference, lag)?;
        let score = score(&pair.candidate, &pair.reference)?;
        let passed = score >= self.config.threshold;
        ctx.record_scalar("validate.score", score);
        ctx.report_progress(0.9);

        let artifacts = self.config.artifacts.wants(passed).then(|| FailureArtifacts {
            candidate_raw: candidate.to_vec(),
            reference_raw: reference.to_vec(),
            candidate_aligned: pair.candidate.to_vec(),
            reference_aligned: pair.reference.to_vec(),
        });

        diagnostics.note(format!(
            "lag_mode={}, lag={lag}, aligned_len={}",
            self.config.lag_mode.as_str(),
            pair.len()
        ));
        diagnostics.note(format!(
            "threshold={}, artifacts={}",
            self.config.threshold,
            self.config.artifacts.as_str()
        ));
        diagnostics.record_runtime(started_at);
        ctx.report_progress(1.0);

        tracing::debug!(lag, score, passed, aligned_len = pair.len(), "validation complete");

        Ok(ValidationReport {
            score,
            lag,
            passed,
            threshold: self.config.threshold,
            truncation,
            aligned_len: pair.len(),
            artifacts,
            diagnostics,
        })
    }
}

/// Validates with cyclic lag detection and artifacts kept on failure.
pub fn validate(
    candidate: &SignalView<'_>,
    reference: &SignalView<'_>,
    threshold: f64,
) -> Result<ValidationReport, GmvError> {
    let config = ValidationConfig {
        threshold,
        ..ValidationConfig::default()
    };
    Validator::new(config)?.run(candidate, reference, &ExecutionContext::new())
}
