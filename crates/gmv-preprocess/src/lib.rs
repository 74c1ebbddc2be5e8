// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Signal conditioning ahead of validation: adaptive piecewise normalization
//! into `[-1, 1]` and phase unwrap across periodic frames.

pub mod normalize;
pub mod unwrap;

pub use normalize::{
    AdaptiveNormalizer, Adjustment, AdjustmentCounts, BoundaryPolicy, NormalizedSignal,
    NormalizerConfig, ScalingState, normalize,
};
pub use unwrap::periodic_unwrap;
