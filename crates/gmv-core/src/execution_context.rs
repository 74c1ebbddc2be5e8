// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::observability::{ProgressSink, TelemetrySink};

/// Unified execution context passed through validation and normalization calls.
///
/// Holds only optional observer hooks; every algorithm parameter is passed
/// explicitly through its config type.
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    pub progress: Option<&'a dyn ProgressSink>,
    pub telemetry: Option<&'a dyn TelemetrySink>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context with no optional hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an optional progress sink.
    pub fn with_progress_sink(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Sets an optional telemetry sink.
    pub fn with_telemetry_sink(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Emits clamped progress to the sink, if configured.
    pub fn report_progress(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }

        if let Some(sink) = self.progress {
            sink.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    /// Emits a finite scalar to the telemetry sink, if configured.
    pub fn record_scalar(&self, key: &'static str, value: f64) {
        if !value.is_finite() {
            return;
        }

        if let Some(sink) = self.telemetry {
            sink.record_scalar(key, value);
        }
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("progress", &self.progress.is_some())
            .field("telemetry", &self.telemetry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionContext;
    use crate::observability::{ProgressSink, TelemetrySink};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        progress: Mutex<Vec<f32>>,
        scalars: Mutex<Vec<(&'static str, f64)>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_progress(&self, fraction: f32) {
            self.progress
                .lock()
                .expect("progress mutex should not be poisoned")
                .push(fraction);
        }
    }

    impl TelemetrySink for RecordingSink {
        fn record_scalar(&self, key: &'static str, value: f64) {
            self.scalars
                .lock()
                .expect("telemetry mutex should not be poisoned")
                .push((key, value));
        }
    }

    #[test]
    fn default_context_has_no_hooks() {
        let ctx = ExecutionContext::new();
        assert!(ctx.progress.is_none());
        assert!(ctx.telemetry.is_none());
        ctx.report_progress(0.5);
        ctx.record_scalar("noop", 1.0);
    }

    #[test]
    fn progress_is_clamped_and_non_finite_is_dropped() {
        let sink = RecordingSink::default();
        let ctx = ExecutionContext::new().with_progress_sink(&sink);
        ctx.report_progress(-1.0);
        ctx.report_progress(0.25);
        ctx.report_progress(4.0);
        ctx.report_progress(f32::NAN);

        let seen = sink.progress.lock().expect("mutex").clone();
        assert_eq!(seen, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn telemetry_skips_non_finite_values() {
        let sink = RecordingSink::default();
        let ctx = ExecutionContext::new().with_telemetry_sink(&sink);
        ctx.record_scalar("validate.lag", 3.0);
        ctx.record_scalar("validate.score", f64::NAN);

        let seen = sink.scalars.lock().expect("mutex").clone();
        assert_eq!(seen, vec![("validate.lag", 3.0)]);
    }
}
