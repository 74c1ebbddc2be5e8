// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gmv_core::{GmvError, SignalView};

/// Equal-length overlapping sub-views of a candidate and a reference.
#[derive(Clone, Copy, Debug)]
pub struct AlignedPair<'a> {
    pub candidate: SignalView<'a>,
    pub reference: SignalView<'a>,
    pub lag: isize,
}

impl AlignedPair<'_> {
    /// Number of samples in each member.
    pub fn len(&self) -> usize {
        self.candidate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trims `candidate` and `reference` so that sample `i` of each aligned member
/// refers to the same instant under `lag`.
///
/// - `lag > 0`: the candidate trails, so its first `lag` samples and the
///   reference's last `lag` samples are dropped.
/// - `lag < 0`: the candidate leads, so its last `|lag|` samples and the
///   reference's first `|lag|` samples are dropped.
///
/// Both members always have length `min(len(candidate), len(reference)) - |lag|`.
/// Fails with [`GmvError::Alignment`] when that length would be zero or negative.
pub fn align<'a>(
    candidate: &SignalView<'a>,
    reference: &SignalView<'a>,
    lag: isize,
) -> Result<AlignedPair<'a>, GmvError> {
    let n = candidate.len();
    let m = reference.len();
    let shift = lag.unsigned_abs();
    let common = n.min(m);

    if shift >= common {
        return Err(GmvError::alignment(lag, n, m));
    }
    let overlap = common - shift;

    let (candidate_range, reference_range) = if lag >= 0 {
        (shift..shift + overlap, 0..overlap)
    } else {
        (0..overlap, shift..shift + overlap)
    };

    let pair = AlignedPair {
        candidate: candidate.slice(candidate_range)?,
        reference: reference.slice(reference_range)?,
        lag,
    };
    debug_assert_eq!(pair.candidate.len(), pair.reference.len());
    Ok(pair)
}
