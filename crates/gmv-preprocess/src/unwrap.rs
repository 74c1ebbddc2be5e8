// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gmv_core::{GmvError, SignalView};
use std::f64::consts::{PI, TAU};

/// Unwraps phase across repetitions of a periodic frame.
///
/// `data` is read as row-major rows of `period` samples. Each column is
/// unwrapped down the rows: jumps of at least `pi` between consecutive rows are
/// folded back by multiples of `2 pi`. The result is flattened in the same order.
pub fn periodic_unwrap(data: &SignalView<'_>, period: usize) -> Result<Vec<f64>, GmvError> {
    if period == 0 {
        return Err(GmvError::invalid_input("unwrap period must be >= 1; got 0"));
    }
    if data.is_empty() {
        return Err(GmvError::invalid_input(format!(
            "unwrap requires a non-empty {}",
            data.operand()
        )));
    }
    if data.len() % period != 0 {
        return Err(GmvError::invalid_input(format!(
            "unwrap requires len % period == 0; got len={}, period={period}",
            data.len()
        )));
    }

    let mut out = data.to_vec();
    let rows = out.len() / period;
    for col in 0..period {
        let mut correction = 0.0;
        let mut prev = out[col];
        for row in 1..rows {
            let idx = row * period + col;
            let raw = out[idx];
            let d = raw - prev;
            prev = raw;
            if d.abs() >= PI {
                correction += fold(d) - d;
            }
            out[idx] = raw + correction;
        }
    }

    tracing::debug!(len = out.len(), period, rows, "periodic unwrap complete");
    Ok(out)
}

/// Maps a phase difference into `[-pi, pi]`, keeping `+pi` for positive jumps.
fn fold(d: f64) -> f64 {
    let folded = (d + PI).rem_euclid(TAU) - PI;
    if folded == -PI && d > 0.0 { PI } else { folded }
}

#[cfg(test)]
mod tests {
    use super::periodic_unwrap;
    use gmv_core::{GmvError, Operand, SignalView};
    use std::f64::consts::{PI, TAU};

    fn data(values: &[f64]) -> SignalView<'_> {
        SignalView::from_f64(values, Operand::Data).expect("test data should be valid")
    }

    fn assert_all_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (idx, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() <= 1e-12, "idx={idx}: actual={a}, expected={e}");
        }
    }

    #[test]
    fn unwraps_each_column_independently() {
        // rows: [0, 0.1], [3, 0.2], [-3, 0.3]
        let values = [0.0, 0.1, 3.0, 0.2, -3.0, 0.3];
        let out = periodic_unwrap(&data(&values), 2).expect("unwrap should succeed");
        assert_all_close(&out, &[0.0, 0.1, 3.0, 0.2, -3.0 + TAU, 0.3]);
    }

    #[test]
    fn corrections_accumulate_down_a_column() {
        let values = [0.0, 6.0, 12.0, 18.0];
        let out = periodic_unwrap(&data(&values), 1).expect("unwrap should succeed");
        assert_all_close(&out, &[0.0, 6.0 - TAU, 12.0 - 2.0 * TAU, 18.0 - 3.0 * TAU]);
    }

    #[test]
    fn exact_positive_pi_jump_is_kept() {
        let values = [0.0, PI];
        let out = periodic_unwrap(&data(&values), 1).expect("unwrap should succeed");
        assert_all_close(&out, &[0.0, PI]);
    }

    #[test]
    fn single_row_is_unchanged() {
        let values = [0.0, 5.0, -5.0];
        let out = periodic_unwrap(&data(&values), 3).expect("unwrap should succeed");
        assert_eq!(out, values.to_vec());
    }

    #[test]
    fn rejects_zero_period_and_ragged_length() {
        let values = [0.0, 1.0, 2.0];
        let err = periodic_unwrap(&data(&values), 0).expect_err("period 0 must fail");
        assert!(matches!(err, GmvError::InvalidInput(_)));

        let err = periodic_unwrap(&data(&values), 2).expect_err("ragged length must fail");
        assert!(err.to_string().contains("len % period"), "{err}");
    }
}
