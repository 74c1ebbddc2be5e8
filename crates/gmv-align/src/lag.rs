// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Integer lag estimation by cross-correlation.
//!
//! The correlation at lag `L` is
//!
//! ```text
//! corr[L] = Σ_j x[j + L] · reference[j]
//! ```
//!
//! where `x` is either the candidate extended with a cyclic postfix
//! ([`LagMode::Cyclic`]) or the zero-padded candidate ([`LagMode::Linear`]).
//! A positive lag means the candidate trails the reference: the candidate must
//! be advanced by `L` samples to line up with it.

use gmv_core::{GmvError, Operand, SignalView};

/// How the candidate is extended before correlating against the reference.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LagMode {
    /// Append `candidate[0..len(reference) - 1]` (wrapping) and correlate over the
    /// valid region. Lags lie in `0..len(candidate)`. Exact for traces that are
    /// periodic at the comparison boundary.
    #[default]
    Cyclic,
    /// Full zero-padded correlation. Lags lie in
    /// `-(len(reference) - 1) ..= len(candidate) - 1`.
    Linear,
}

impl LagMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cyclic => "cyclic",
            Self::Linear => "linear",
        }
    }
}

/// Cross-correlation values together with their lag axis.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationCurve {
    pub lags: Vec<isize>,
    pub values: Vec<f64>,
}

impl CorrelationCurve {
    /// Lag and value of the first maximum along the lag axis. Non-finite
    /// values are skipped; `None` when no finite value remains.
    pub fn peak(&self) -> Option<(isize, f64)> {
        let mut best: Option<(isize, f64)> = None;
        for (&lag, &value) in self.lags.iter().zip(self.values.iter()) {
            if !value.is_finite() {
                continue;
            }
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((lag, value)),
            }
        }
        best
    }
}

/// Detects the lag of `candidate` relative to `reference` using [`LagMode::Cyclic`].
pub fn detect_lag(
    candidate: &SignalView<'_>,
    reference: &SignalView<'_>,
) -> Result<isize, GmvError> {
    detect_lag_with(candidate, reference, LagMode::Cyclic)
}

/// Detects the lag of `candidate` relative to `reference`.
///
/// Ties resolve to the lowest lag on the curve.
pub fn detect_lag_with(
    candidate: &SignalView<'_>,
    reference: &SignalView<'_>,
    mode: LagMode,
) -> Result<isize, GmvError> {
    let curve = cross_correlation(candidate, reference, mode)?;
    let (lag, peak) = curve.peak().ok_or_else(|| {
        GmvError::invalid_input(
            "cross-correlation has no finite value; sample magnitudes overflow f64",
        )
    })?;
    tracing::debug!(mode = mode.as_str(), lag, peak, "lag detected");
    Ok(lag)
}

/// Computes the cross-correlation curve of `candidate` against `reference`.
pub fn cross_correlation(
    candidate: &SignalView<'_>,
    reference: &SignalView<'_>,
    mode: LagMode,
) -> Result<CorrelationCurve, GmvError> {
    ensure_non_empty(candidate, Operand::Candidate)?;
    ensure_non_empty(reference, Operand::Reference)?;

    match mode {
        LagMode::Cyclic => cyclic_correlation(candidate, reference),
        LagMode::Linear => linear_correlation(candidate, reference),
    }
}

fn cyclic_correlation(
    candidate: &SignalView<'_>,
    reference: &SignalView<'_>,
) -> Result<CorrelationCurve, GmvError> {
    let n = candidate.len();
    let m = reference.len();
    let cand = candidate.to_vec();
    let refs = reference.to_vec();

    // extended[k] = cand[k % n] for k in 0..n + m - 1; every offset 0..n is valid.
    let mut lags = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    for offset in 0..n {
        let mut sum = 0.0;
        let mut idx = offset;
        for &r in &refs {
            sum += cand[idx] * r;
            idx += 1;
            if idx == n {
                idx = 0;
            }
        }
        lags.push(to_isize(offset)?);
        values.push(sum);
    }

    debug_assert_eq!(values.len(), (n + m - 1) - m + 1);
    Ok(CorrelationCurve { lags, values })
}

fn linear_correlation(
    candidate: &SignalView<'_>,
    reference: &SignalView<'_>,
) -> Result<CorrelationCurve, GmvError> {
    let n = to_isize(candidate.len())?;
    let m = to_isize(reference.len())?;
    let cand = candidate.to_vec();
    let refs = reference.to_vec();

    let count = candidate.len() + reference.len() - 1;
    let mut lags = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count);
    for lag in -(m - 1)..n {
        // j must satisfy 0 <= j < m and 0 <= j + lag < n.
        let j_start = (-lag).max(0) as usize;
        let j_end = m.min(n - lag).max(0) as usize;
        let mut sum = 0.0;
        for j in j_start..j_end {
            sum += cand[(j as isize + lag) as usize] * refs[j];
        }
        lags.push(lag);
        values.push(sum);
    }

    Ok(CorrelationCurve { lags, values })
}

fn ensure_non_empty(signal: &SignalView<'_>, operand: Operand) -> Result<(), GmvError> {
    if signal.is_empty() {
        return Err(GmvError::invalid_input(format!(
            "lag detection requires a non-empty {operand}"
        )));
    }
    Ok(())
}

fn to_isize(value: usize) -> Result<isize, GmvError> {
    isize::try_from(value).map_err(|_| {
        GmvError::invalid_input(format!("length {value} does not fit into isize"))
    })
}

#[cfg(test)]
mod tests {
    use super::{CorrelationCurve, LagMode, cross_correlation, detect_lag, detect_lag_with};
    use gmv_core::{GmvError, Operand, SignalView};

    fn cand(values: &[f64]) -> SignalView<'_> {
        SignalView::from_f64(values, Operand::Candidate).expect("test candidate should be valid")
    }

    fn refr(values: &[f64]) -> SignalView<'_> {
        SignalView::from_f64(values, Operand::Reference).expect("test reference should be valid")
    }

    #[test]
    fn periodic_candidate_trailing_reference_by_two() {
        let candidate = [0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 1.0, 2.0, 3.0];
        let reference = [2.0, 3.0, 4.0, 0.0, 1.0];
        let lag = detect_lag(&cand(&candidate), &refr(&reference)).expect("lag should resolve");
        assert_eq!(lag, 2);
    }

    #[test]
    fn cyclic_curve_matches_hand_computed_values() {
        let candidate = [1.0, 2.0, 3.0];
        let reference = [1.0, 0.0];
        let curve = cross_correlation(&cand(&candidate), &refr(&reference), LagMode::Cyclic)
            .expect("curve should compute");
        // extended = [1, 2, 3, 1]
        assert_eq!(curve.lags, vec![0, 1, 2]);
        assert_eq!(curve.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn cyclic_extension_wraps_when_reference_is_longer() {
        let candidate = [0.0, 1.0];
        let reference = [1.0, 0.0, 1.0, 0.0, 1.0];
        let curve = cross_correlation(&cand(&candidate), &refr(&reference), LagMode::Cyclic)
            .expect("curve should compute");
        // extended = [0, 1, 0, 1, 0, 1]
        assert_eq!(curve.lags, vec![0, 1]);
        assert_eq!(curve.values, vec![0.0, 3.0]);
    }

    #[test]
    fn identical_inputs_have_zero_lag() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let lag = detect_lag(&cand(&values), &refr(&values)).expect("lag should resolve");
        assert_eq!(lag, 0);
    }

    #[test]
    fn ties_resolve_to_first_maximum() {
        let curve = CorrelationCurve {
            lags: vec![-1, 0, 1, 2],
            values: vec![1.0, 4.0, 4.0, 2.0],
        };
        assert_eq!(curve.peak(), Some((0, 4.0)));

        let constant = [1.0; 4];
        let lag = detect_lag(&cand(&constant), &refr(&constant)).expect("lag should resolve");
        assert_eq!(lag, 0);
    }

    #[test]
    fn non_finite_values_do_not_displace_the_peak() {
        let curve = CorrelationCurve {
            lags: vec![0, 1, 2, 3, 4],
            values: vec![2.0, f64::NAN, 5.0, f64::INFINITY, 3.0],
        };
        assert_eq!(curve.peak(), Some((2, 5.0)));

        let leading_nan = CorrelationCurve {
            lags: vec![0, 1, 2],
            values: vec![f64::NAN, 1.0, 0.5],
        };
        assert_eq!(leading_nan.peak(), Some((1, 1.0)));

        let overflowed = CorrelationCurve {
            lags: vec![0, 1],
            values: vec![f64::NAN, f64::NEG_INFINITY],
        };
        assert_eq!(overflowed.peak(), None);
    }

    #[test]
    fn overflowing_correlation_sums_are_rejected() {
        let values = [f64::MAX, -f64::MAX, f64::MAX, -f64::MAX];
        let err = detect_lag(&cand(&values), &refr(&values)).expect_err("overflow must fail");
        assert!(matches!(err, GmvError::InvalidInput(_)), "{err}");
    }

    #[test]
    fn linear_mode_reports_negative_lag_when_candidate_leads() {
        // candidate is the reference advanced by 2 samples.
        let reference = [0.0, 0.0, 1.0, 3.0, 1.0, 0.0, 0.0, 0.0];
        let candidate = [1.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let lag = detect_lag_with(&cand(&candidate), &refr(&reference), LagMode::Linear)
            .expect("lag should resolve");
        assert_eq!(lag, -2);
    }

    #[test]
    fn linear_curve_spans_full_lag_axis() {
        let candidate = [1.0, 2.0, 3.0];
        let reference = [1.0, 0.5];
        let curve = cross_correlation(&cand(&candidate), &refr(&reference), LagMode::Linear)
            .expect("curve should compute");
        assert_eq!(curve.lags, vec![-1, 0, 1, 2]);
        // lag -1: c[0]*r[1]; lag 0: c0 r0 + c1 r1; lag 1: c1 r0 + c2 r1; lag 2: c2 r0
        assert_eq!(curve.values, vec![0.5, 2.0, 3.5, 3.0]);
    }

    #[test]
    fn empty_sub_view_is_rejected() {
        let values = [1.0, 2.0];
        let full = cand(&values);
        let empty = full.slice(0..0).expect("empty slice is in bounds");
        let err = detect_lag(&empty, &refr(&values)).expect_err("empty candidate must fail");
        assert!(matches!(err, GmvError::InvalidInput(_)));
        assert!(err.to_string().contains("candidate"), "{err}");
    }
}
