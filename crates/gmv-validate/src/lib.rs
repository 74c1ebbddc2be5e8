// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Validation of a device-under-test trace against a golden reference trace.
//!
//! Inputs of unequal length are truncated to the shorter one (and the report
//! says so), the lag is detected by cross-correlation, the pair is aligned and
//! the overlap is scored with the Pearson coefficient.

pub mod driver;
pub mod report;

pub use driver::{ArtifactPolicy, DEFAULT_THRESHOLD, ValidationConfig, Validator, validate};
pub use report::{FailureArtifacts, Truncation, ValidationReport};
