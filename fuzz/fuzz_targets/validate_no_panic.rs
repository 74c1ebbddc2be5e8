// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use gmv_align::LagMode;
use gmv_core::{ExecutionContext, Operand, SignalView};
use gmv_validate::{ArtifactPolicy, ValidationConfig, Validator};
use libfuzzer_sys::fuzz_target;

fn build_config(threshold_seed: i16, mode_seed: u8, artifact_seed: u8) -> ValidationConfig {
    let lag_mode = if mode_seed & 1 == 0 {
        LagMode::Cyclic
    } else {
        LagMode::Linear
    };
    let artifacts = match artifact_seed % 3 {
        0 => ArtifactPolicy::OnFailure,
        1 => ArtifactPolicy::Always,
        _ => ArtifactPolicy::Never,
    };
    ValidationConfig {
        // Occasionally out of [-1, 1] so config rejection is exercised.
        threshold: f64::from(threshold_seed) / 16_000.0,
        lag_mode,
        artifacts,
    }
}

fn build_signal(cursor: &mut common::ByteCursor<'_>, len_seed: u8) -> Vec<f64> {
    let len = common::bounded(len_seed, 0, 96);
    let raw = common::decode_f64_chunks(&cursor.take_padded(len.saturating_mul(8)), len);
    raw.into_iter()
        .map(|value| common::shape_sample(value, cursor.next_u8()))
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let config = build_config(cursor.next_i16(), cursor.next_u8(), cursor.next_u8());
    let Ok(validator) = Validator::new(config) else {
        return;
    };

    let candidate_seed = cursor.next_u8();
    let reference_seed = cursor.next_u8();
    let candidate = build_signal(&mut cursor, candidate_seed);
    let reference = build_signal(&mut cursor, reference_seed);

    let (Ok(candidate), Ok(reference)) = (
        SignalView::from_f64(&candidate, Operand::Candidate),
        SignalView::from_f64(&reference, Operand::Reference),
    ) else {
        return;
    };

    if let Ok(report) = validator.run(&candidate, &reference, &ExecutionContext::new()) {
        assert!(report.score.is_finite());
        assert!((-1.0..=1.0).contains(&report.score));
        assert_eq!(report.passed, report.score >= report.threshold);
        assert!(report.aligned_len >= 1);
        assert!(report.aligned_len <= candidate.len().min(reference.len()));
        if let Some(artifacts) = &report.artifacts {
            assert_eq!(artifacts.candidate_aligned.len(), report.aligned_len);
            assert_eq!(artifacts.reference_aligned.len(), report.aligned_len);
        }
    }
});
