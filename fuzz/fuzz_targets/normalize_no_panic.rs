// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use gmv_core::{ExecutionContext, Operand, SignalView};
use gmv_preprocess::{AdaptiveNormalizer, BoundaryPolicy, NormalizerConfig, periodic_unwrap};
use libfuzzer_sys::fuzz_target;

fn build_config(cursor: &mut common::ByteCursor<'_>) -> NormalizerConfig {
    let boundary = if cursor.next_u8() & 1 == 0 {
        BoundaryPolicy::WindowEnd
    } else {
        BoundaryPolicy::LeadingSample
    };
    NormalizerConfig {
        period: common::bounded(cursor.next_u8(), 0, 32),
        overflow_limit: f64::from(cursor.next_u8()) / 255.0,
        underflow_limit: f64::from(cursor.next_u8()) / 255.0,
        step: f64::from(cursor.next_i16()) / 4_096.0,
        initial_factor: f64::from(cursor.next_i16()) / 1_024.0,
        boundary,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let config = build_config(&mut cursor);
    let unwrap_period = common::bounded(cursor.next_u8(), 0, 16);

    let len = common::bounded(cursor.next_u8(), 0, 160);
    let raw = common::decode_f64_chunks(&cursor.take_padded(len.saturating_mul(8)), len);
    let values = raw
        .into_iter()
        .map(|value| common::shape_sample(value, cursor.next_u8()))
        .collect::<Vec<_>>();

    let Ok(view) = SignalView::from_f64(&values, Operand::Data) else {
        return;
    };

    if let Ok(normalizer) = AdaptiveNormalizer::new(config) {
        if let Ok(result) = normalizer.apply(&view, &ExecutionContext::new()) {
            assert_eq!(result.values.len(), view.len());
            assert!(result.scaling_history.iter().all(|factor| factor.is_finite()));
            assert!(result.scaling_history.len() <= view.len() / config.period + 1);
        }
    }

    if let Ok(unwrapped) = periodic_unwrap(&view, unwrap_period) {
        assert_eq!(unwrapped.len(), view.len());
    }
});
