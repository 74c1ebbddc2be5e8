// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gmv_core::{GmvError, SignalView};

/// Pearson correlation coefficient of two equal-length sequences.
///
/// Computed in two passes over mean-centred samples and clamped to `[-1, 1]`.
/// Fails with [`GmvError::DegenerateInput`] when either sequence is constant,
/// naming the operand, and with [`GmvError::InvalidInput`] on a length mismatch
/// or fewer than two samples.
pub fn score(a: &SignalView<'_>, b: &SignalView<'_>) -> Result<f64, GmvError> {
    if a.len() != b.len() {
        return Err(GmvError::invalid_input(format!(
            "similarity scoring requires equal lengths: {}={}, {}={}",
            a.operand(),
            a.len(),
            b.operand(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(GmvError::invalid_input(format!(
            "similarity scoring requires at least 2 samples, got {}",
            a.len()
        )));
    }

    ensure_not_constant(a)?;
    ensure_not_constant(b)?;

    // Each operand is scaled into [-1, 1] first; the coefficient is
    // scale-invariant and the sums then stay clear of overflow and underflow.
    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    let n = a.len() as f64;
    let mean_a = a.iter().map(|x| x / scale_a).sum::<f64>() / n;
    let mean_b = b.iter().map(|y| y / scale_b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut ss_a = 0.0;
    let mut ss_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x / scale_a - mean_a;
        let dy = y / scale_b - mean_b;
        cov += dx * dy;
        ss_a += dx * dx;
        ss_b += dy * dy;
    }

    let r = cov / (ss_a.sqrt() * ss_b.sqrt());
    if !r.is_finite() {
        return Err(GmvError::invalid_input(format!(
            "correlation coefficient is not finite (cov={cov}, ss_{}={ss_a}, ss_{}={ss_b})",
            a.operand(),
            b.operand()
        )));
    }

    Ok(r.clamp(-1.0, 1.0))
}

/// Largest sample magnitude; non-zero for a non-constant signal.
fn max_abs(signal: &SignalView<'_>) -> f64 {
    signal.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}

fn ensure_not_constant(signal: &SignalView<'_>) -> Result<(), GmvError> {
    let first = signal.get(0);
    if signal.iter().all(|v| v == first) {
        return Err(GmvError::degenerate(signal.operand(), signal.len()));
    }
    Ok(())
}
