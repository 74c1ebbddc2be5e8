// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{GmvError, Operand};
use std::ops::Range;

/// Borrowed numeric data view over either f32 or f64 values.
#[derive(Clone, Copy, Debug)]
pub enum DTypeView<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl<'a> DTypeView<'a> {
    pub fn len(&self) -> usize {
        match self {
            Self::F32(values) => values.len(),
            Self::F64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, range: Range<usize>) -> Self {
        match self {
            Self::F32(values) => Self::F32(&values[range]),
            Self::F64(values) => Self::F64(&values[range]),
        }
    }
}

/// Zero-copy view over a single-channel sampled trace.
///
/// Sample index is discrete time. Construction guarantees the view is
/// non-empty and every sample is finite; sub-views produced by [`SignalView::slice`]
/// may be empty only when explicitly asked for an empty range.
#[derive(Clone, Copy, Debug)]
pub struct SignalView<'a> {
    values: DTypeView<'a>,
    operand: Operand,
}

impl<'a> SignalView<'a> {
    /// Constructs a validated `SignalView`.
    pub fn new(values: DTypeView<'a>, operand: Operand) -> Result<Self, GmvError> {
        if values.is_empty() {
            return Err(GmvError::invalid_input(format!(
                "{operand} must contain at least one sample"
            )));
        }

        let first_bad = match values {
            DTypeView::F32(slice) => slice.iter().position(|v| !v.is_finite()),
            DTypeView::F64(slice) => slice.iter().position(|v| !v.is_finite()),
        };
        if let Some(idx) = first_bad {
            return Err(GmvError::invalid_input(format!(
                "{operand} sample {idx} is not finite"
            )));
        }

        Ok(Self { values, operand })
    }

    /// Convenience constructor for f32-backed data.
    pub fn from_f32(values: &'a [f32], operand: Operand) -> Result<Self, GmvError> {
        Self::new(DTypeView::F32(values), operand)
    }

    /// Convenience constructor for f64-backed data.
    pub fn from_f64(values: &'a [f64], operand: Operand) -> Result<Self, GmvError> {
        Self::new(DTypeView::F64(values), operand)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn operand(&self) -> Operand {
        self.operand
    }

    pub fn values(&self) -> DTypeView<'a> {
        self.values
    }

    /// Returns sample `idx` widened to f64.
    ///
    /// Panics when `idx` is out of bounds, like slice indexing.
    #[inline]
    pub fn get(&self, idx: usize) -> f64 {
        match self.values {
            DTypeView::F32(values) => f64::from(values[idx]),
            DTypeView::F64(values) => values[idx],
        }
    }

    /// Iterates over all samples widened to f64.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |idx| self.get(idx))
    }

    /// Copies the samples into an owned f64 vector.
    pub fn to_vec(&self) -> Vec<f64> {
        match self.values {
            DTypeView::F32(values) => values.iter().copied().map(f64::from).collect(),
            DTypeView::F64(values) => values.to_vec(),
        }
    }

    /// Returns a sub-view over `range`, keeping the operand tag.
    pub fn slice(&self, range: Range<usize>) -> Result<Self, GmvError> {
        if range.start > range.end || range.end > self.len() {
            return Err(GmvError::invalid_input(format!(
                "{} slice {}..{} is out of bounds for length {}",
                self.operand,
                range.start,
                range.end,
                self.len()
            )));
        }
        Ok(Self {
            values: self.values.slice(range),
            operand: self.operand,
        })
    }

    /// Keeps the first `len` samples.
    pub fn truncate(&self, len: usize) -> Result<Self, GmvError> {
        self.slice(0..len)
    }

    /// Arithmetic mean of the samples.
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.iter().sum::<f64>() / self.len() as f64
    }
}
