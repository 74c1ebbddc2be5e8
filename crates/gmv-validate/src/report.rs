// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gmv_core::Diagnostics;

/// Records that the longer input was cut to the length of the shorter one.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truncation {
    pub candidate_len: usize,
    pub reference_len: usize,
    pub retained_len: usize,
}

impl Truncation {
    /// Returns `None` when the lengths already agree.
    pub fn between(candidate_len: usize, reference_len: usize) -> Option<Self> {
        (candidate_len != reference_len).then(|| Self {
            candidate_len,
            reference_len,
            retained_len: candidate_len.min(reference_len),
        })
    }
}

/// Owned copies of the compared traces, kept for external plotting.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FailureArtifacts {
    /// Candidate after length truncation, before lag alignment.
    pub candidate_raw: Vec<f64>,
    /// Reference after length truncation, before lag alignment.
    pub reference_raw: Vec<f64>,
    pub candidate_aligned: Vec<f64>,
    pub reference_aligned: Vec<f64>,
}

/// Outcome of one validation run. `passed == false` is a normal result.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationReport {
    pub score: f64,
    pub lag: isize,
    pub passed: bool,
    pub threshold: f64,
    pub truncation: Option<Truncation>,
    pub aligned_len: usize,
    pub artifacts: Option<FailureArtifacts>,
    pub diagnostics: Diagnostics,
}

impl ValidationReport {
    pub fn was_truncated(&self) -> bool {
        self.truncation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Truncation;

    #[test]
    fn truncation_is_only_recorded_for_unequal_lengths() {
        assert_eq!(Truncation::between(7, 7), None);
        assert_eq!(
            Truncation::between(10, 7),
            Some(Truncation {
                candidate_len: 10,
                reference_len: 7,
                retained_len: 7,
            })
        );
        assert_eq!(
            Truncation::between(3, 8).map(|t| t.retained_len),
            Some(3)
        );
    }
}
