// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gmv_align::{LagMode, cross_correlation, detect_lag_with};
use gmv_bench::{delayed, waveform};
use gmv_core::{ExecutionContext, Operand, SignalView};
use gmv_validate::{ValidationConfig, Validator};

const SIZES: [usize; 3] = [256, 1_024, 4_096];

fn benchmark_lag_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("lag_detect");

    for n in SIZES {
        let reference = waveform(n, 0x5eed_0001);
        let candidate = delayed(&reference, n / 7);
        let candidate_view = SignalView::from_f64(&candidate, Operand::Candidate)
            .expect("benchmark candidate should be valid");
        let reference_view = SignalView::from_f64(&reference, Operand::Reference)
            .expect("benchmark reference should be valid");

        group.bench_function(format!("cyclic_n{n}"), |b| {
            b.iter(|| {
                let lag = detect_lag_with(
                    black_box(&candidate_view),
                    black_box(&reference_view),
                    LagMode::Cyclic,
                )
                .expect("lag detection should succeed");
                black_box(lag);
            })
        });

        group.bench_function(format!("linear_curve_n{n}"), |b| {
            b.iter(|| {
                let curve = cross_correlation(
                    black_box(&candidate_view),
                    black_box(&reference_view),
                    LagMode::Linear,
                )
                .expect("cross-correlation should succeed");
                black_box(curve);
            })
        });
    }

    group.finish();
}

fn benchmark_validation(c: &mut Criterion) {
    let reference = waveform(4_096, 0x5eed_0002);
    let candidate = delayed(&reference, 333);
    let candidate_view =
        SignalView::from_f64(&candidate, Operand::Candidate).expect("candidate should be valid");
    let reference_view =
        SignalView::from_f64(&reference, Operand::Reference).expect("reference should be valid");
    let validator =
        Validator::new(ValidationConfig::default()).expect("default config should be valid");

    c.bench_function("validate_end_to_end_n4096", |b| {
        b.iter(|| {
            let report = validator
                .run(
                    black_box(&candidate_view),
                    black_box(&reference_view),
                    &ExecutionContext::new(),
                )
                .expect("validation should run");
            black_box(report);
        })
    });
}

criterion_group!(benches, benchmark_lag_detection, benchmark_validation);
criterion_main!(benches);
