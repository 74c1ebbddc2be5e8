// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Identifies which input sequence an error refers to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// The trace under test ("yours").
    Candidate,
    /// The golden trace.
    Reference,
    /// The single input of a one-sequence operation such as normalization.
    Data,
}

impl Operand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Reference => "reference",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type shared by every gmv crate.
#[derive(Clone, Debug, PartialEq)]
pub enum GmvError {
    /// Malformed input: empty or non-finite sequences, bad parameters, unresolved length mismatch.
    InvalidInput(String),
    /// Applying `lag` to the pair leaves no overlapping samples.
    Alignment {
        lag: isize,
        candidate_len: usize,
        reference_len: usize,
    },
    /// `operand` has zero variance, so the correlation coefficient is undefined.
    DegenerateInput { operand: Operand, len: usize },
}

impl GmvError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn alignment(lag: isize, candidate_len: usize, reference_len: usize) -> Self {
        Self::Alignment {
            lag,
            candidate_len,
            reference_len,
        }
    }

    pub fn degenerate(operand: Operand, len: usize) -> Self {
        Self::DegenerateInput { operand, len }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Alignment { .. } => "alignment_error",
            Self::DegenerateInput { .. } => "degenerate_input",
        }
    }
}

impl fmt::Display for GmvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Alignment {
                lag,
                candidate_len,
                reference_len,
            } => write!(
                f,
                "alignment error: lag={lag} leaves no overlap (candidate_len={candidate_len}, reference_len={reference_len})"
            ),
            Self::DegenerateInput { operand, len } => write!(
                f,
                "degenerate input: {operand} has zero variance over {len} samples; correlation coefficient is undefined"
            ),
        }
    }
}

impl std::error::Error for GmvError {}

#[cfg(test)]
mod tests {
    use super::{GmvError, Operand};

    #[test]
    fn codes_are_stable() {
        assert_eq!(GmvError::invalid_input("x").code(), "invalid_input");
        assert_eq!(GmvError::alignment(3, 2, 2).code(), "alignment_error");
        assert_eq!(
            GmvError::degenerate(Operand::Reference, 4).code(),
            "degenerate_input"
        );
    }

    #[test]
    fn display_names_operand_lag_and_lengths() {
        let alignment = GmvError::alignment(-5, 4, 9).to_string();
        assert!(alignment.contains("lag=-5"), "{alignment}");
        assert!(alignment.contains("candidate_len=4"), "{alignment}");
        assert!(alignment.contains("reference_len=9"), "{alignment}");

        let degenerate = GmvError::degenerate(Operand::Candidate, 7).to_string();
        assert!(degenerate.contains("candidate"), "{degenerate}");
        assert!(degenerate.contains("7 samples"), "{degenerate}");
    }
}
