// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic trace generators shared by the gmv-rs benchmarks.

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Uniform noise in `[-amplitude, amplitude)`.
pub fn noise(n: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            let unit = (lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64;
            (unit * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// A two-tone trace with a little noise, shaped like a captured waveform.
pub fn waveform(n: usize, seed: u64) -> Vec<f64> {
    noise(n, 0.05, seed)
        .into_iter()
        .enumerate()
        .map(|(idx, jitter)| {
            let x = idx as f64;
            (x * 0.05).sin() + 0.3 * (x * 0.31).cos() + jitter
        })
        .collect()
}

/// `values` cyclically delayed by `delay` samples.
pub fn delayed(values: &[f64], delay: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut out = values.to_vec();
    out.rotate_right(delay % values.len());
    out
}

/// A ramp of phases wrapped into `[-pi, pi)`.
pub fn wrapped_phase(n: usize, step: f64) -> Vec<f64> {
    use std::f64::consts::{PI, TAU};
    (0..n)
        .map(|idx| (idx as f64 * step + PI).rem_euclid(TAU) - PI)
        .collect()
}
