// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Adaptive piecewise normalization.
//!
//! A causal gain loop: every sample is multiplied by the current scaling
//! factor and classified as overflow (`|x| > 1`), underflow (`|x| < 0.5`) or
//! in band. At each window boundary the factor moves by one fixed step in
//! response to the window's overflow/underflow ratios, overflow first.

use gmv_core::{Diagnostics, ExecutionContext, GmvError, SignalView};
use std::time::Instant;

const DEFAULT_PERIOD: usize = 10;
const DEFAULT_OVERFLOW_LIMIT: f64 = 0.1;
const DEFAULT_UNDERFLOW_LIMIT: f64 = 0.9;
const DEFAULT_STEP: f64 = 0.01;
const DEFAULT_INITIAL_FACTOR: f64 = 1.0;
const OVERFLOW_BOUND: f64 = 1.0;
const UNDERFLOW_BOUND: f64 = 0.5;
const PROGRESS_WINDOWS: usize = 64;

/// Where window boundaries fall along the sample index.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// A boundary closes every complete window, after sample `i` where
    /// `(i + 1) % period == 0`. A trailing partial window is not evaluated.
    #[default]
    WindowEnd,
    /// A boundary follows sample `i` where `i % period == 0`, including `i == 0`.
    /// The first record is taken after a single sample.
    LeadingSample,
}

impl BoundaryPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WindowEnd => "window_end",
            Self::LeadingSample => "leading_sample",
        }
    }

    fn is_boundary(self, idx: usize, period: usize) -> bool {
        match self {
            Self::WindowEnd => (idx + 1) % period == 0,
            Self::LeadingSample => idx % period == 0,
        }
    }
}

/// Adaptive normalizer configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizerConfig {
    /// Samples per window.
    pub period: usize,
    /// Decrement the factor when `overflow / period` exceeds this ratio.
    pub overflow_limit: f64,
    /// Increment the factor when `underflow / period` exceeds this ratio.
    pub underflow_limit: f64,
    pub step: f64,
    pub initial_factor: f64,
    pub boundary: BoundaryPolicy,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            overflow_limit: DEFAULT_OVERFLOW_LIMIT,
            underflow_limit: DEFAULT_UNDERFLOW_LIMIT,
            step: DEFAULT_STEP,
            initial_factor: DEFAULT_INITIAL_FACTOR,
            boundary: BoundaryPolicy::WindowEnd,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<(), GmvError> {
        if self.period == 0 {
            return Err(GmvError::invalid_input(
                "normalizer period must be >= 1; got 0",
            ));
        }
        if !self.overflow_limit.is_finite() || self.overflow_limit < 0.0 {
            return Err(GmvError::invalid_input(format!(
                "normalizer overflow_limit must be finite and >= 0; got {}",
                self.overflow_limit
            )));
        }
        if !self.underflow_limit.is_finite() || self.underflow_limit < 0.0 {
            return Err(GmvError::invalid_input(format!(
                "normalizer underflow_limit must be finite and >= 0; got {}",
                self.underflow_limit
            )));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(GmvError::invalid_input(format!(
                "normalizer step must be finite and > 0; got {}",
                self.step
            )));
        }
        if !self.initial_factor.is_finite() || self.initial_factor <= 0.0 {
            return Err(GmvError::invalid_input(format!(
                "normalizer initial_factor must be finite and > 0; got {}",
                self.initial_factor
            )));
        }
        Ok(())
    }
}

/// Outcome of evaluating one window boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    Decrement,
    Increment,
    Hold,
}

/// Number of factor adjustments made over a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdjustmentCounts {
    pub decrements: usize,
    pub increments: usize,
}

/// Mutable loop state; one per normalization run.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingState {
    factor: f64,
    overflow: usize,
    underflow: usize,
    overflow_total: usize,
    underflow_total: usize,
    history: Vec<f64>,
    adjustments: AdjustmentCounts,
}

impl ScalingState {
    pub fn new(initial_factor: f64) -> Self {
        Self {
            factor: initial_factor,
            overflow: 0,
            underflow: 0,
            overflow_total: 0,
            underflow_total: 0,
            history: vec![],
            adjustments: AdjustmentCounts::default(),
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Overflow and underflow counts in the currently open window.
    pub fn window_counts(&self) -> (usize, usize) {
        (self.overflow, self.underflow)
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Scales `sample` by the current factor and classifies the product.
    pub fn observe(&mut self, sample: f64) -> f64 {
        let scaled = sample * self.factor;
        let magnitude = scaled.abs();
        if magnitude > OVERFLOW_BOUND {
            self.overflow += 1;
            self.overflow_total += 1;
        } else if magnitude < UNDERFLOW_BOUND {
            self.underflow += 1;
            self.underflow_total += 1;
        }
        scaled
    }

    /// Evaluates the open window, adjusts the factor by at most one step,
    /// resets the window counters and records the factor.
    pub fn close_window(&mut self, config: &NormalizerConfig) -> Adjustment {
        let period = config.period as f64;
        let overflow_ratio = self.overflow as f64 / period;
        let underflow_ratio = self.underflow as f64 / period;

        let adjustment = if overflow_ratio > config.overflow_limit {
            self.factor -= config.step;
            self.adjustments.decrements += 1;
            Adjustment::Decrement
        } else if underflow_ratio > config.underflow_limit {
            self.factor += config.step;
            self.adjustments.increments += 1;
            Adjustment::Increment
        } else {
            Adjustment::Hold
        };

        self.overflow = 0;
        self.underflow = 0;
        self.history.push(self.factor);
        adjustment
    }
}

/// Output of a normalization run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedSignal {
    pub values: Vec<f64>,
    pub scaling_history: Vec<f64>,
    pub overflow_total: usize,
    pub underflow_total: usize,
    pub adjustments: AdjustmentCounts,
    pub diagnostics: Diagnostics,
}

impl NormalizedSignal {
    /// Factor in effect after the last evaluated boundary.
    pub fn final_factor(&self) -> Option<f64> {
        self.scaling_history.last().copied()
    }
}

/// Adaptive piecewise normalizer with a validated configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptiveNormalizer {
    config: NormalizerConfig,
}

impl AdaptiveNormalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self, GmvError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn apply(
        &self,
        data: &SignalView<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<NormalizedSignal, GmvError> {
        if data.is_empty() {
            return Err(GmvError::invalid_input(format!(
                "normalization requires a non-empty {}",
                data.operand()
            )));
        }

        let started_at = Instant::now();
        let config = &self.config;
        let n = data.len();
        let progress_every = (n / PROGRESS_WINDOWS).max(1);

        let mut state = ScalingState::new(config.initial_factor);
        let mut values = Vec::with_capacity(n);
        for (idx, sample) in data.iter().enumerate() {
            values.push(state.observe(sample));
            if config.boundary.is_boundary(idx, config.period) {
                let adjustment = state.close_window(config);
                tracing::trace!(idx, factor = state.factor(), ?adjustment, "window closed");
            }
            if (idx + 1) % progress_every == 0 {
                ctx.report_progress((idx + 1) as f32 / n as f32);
            }
        }

        let mut diagnostics = Diagnostics::for_algorithm("adaptive_normalize");
        diagnostics.note(format!(
            "period={}, boundary={}, step={}",
            config.period,
            config.boundary.as_str(),
            config.step
        ));
        let trailing = match config.boundary {
            BoundaryPolicy::WindowEnd => n % config.period,
            BoundaryPolicy::LeadingSample => (n - 1) % config.period,
        };
        if trailing > 0 {
            diagnostics.warn(format!(
                "trailing partial window of {trailing} samples not evaluated"
            ));
        }
        if state.history.is_empty() {
            diagnostics.warn(format!(
                "no window boundary reached: {n} samples with period {}",
                config.period
            ));
        }
        if state.factor <= 0.0 {
            diagnostics.warn(format!(
                "scaling factor reached non-positive value {}",
                state.factor
            ));
        }
        diagnostics.record_runtime(started_at);

        ctx.record_scalar("normalize.final_factor", state.factor);
        ctx.record_scalar("normalize.overflow_total", state.overflow_total as f64);
        ctx.record_scalar("normalize.underflow_total", state.underflow_total as f64);
        ctx.report_progress(1.0);

        tracing::debug!(
            samples = n,
            windows = state.history.len(),
            decrements = state.adjustments.decrements,
            increments = state.adjustments.increments,
            final_factor = state.factor,
            "normalization complete"
        );

        Ok(NormalizedSignal {
            values,
            scaling_history: state.history,
            overflow_total: state.overflow_total,
            underflow_total: state.underflow_total,
            adjustments: state.adjustments,
            diagnostics,
        })
    }
}

/// Normalizes `data` with the default step, initial factor and boundary policy.
pub fn normalize(
    data: &SignalView<'_>,
    period: usize,
    overflow_limit: f64,
    underflow_limit: f64,
) -> Result<NormalizedSignal, GmvError> {
    let config = NormalizerConfig {
        period,
        overflow_limit,
        underflow_limit,
        ..NormalizerConfig::default()
    };
    AdaptiveNormalizer::new(config)?.apply(data, &ExecutionContext::new())
}
