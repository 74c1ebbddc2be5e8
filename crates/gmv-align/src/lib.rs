// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Lag detection, lag alignment and similarity scoring for a candidate trace
//! against a golden reference trace.

pub mod align;
pub mod lag;
pub mod similarity;

pub use align::{AlignedPair, align};
pub use lag::{CorrelationCurve, LagMode, cross_correlation, detect_lag, detect_lag_with};
pub use similarity::score;
