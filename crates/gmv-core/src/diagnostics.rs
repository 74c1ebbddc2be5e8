// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::time::Instant;

/// Diagnostics schema version for validation and normalization run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from a single run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_us: Option<u64>,
    pub algorithm: Cow<'static, str>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    #[cfg(feature = "serde")]
    pub params_json: Option<serde_json::Value>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_us: None,
            algorithm: Cow::Borrowed(""),
            notes: vec![],
            warnings: vec![],
            #[cfg(feature = "serde")]
            params_json: None,
        }
    }
}

impl Diagnostics {
    /// Creates diagnostics tagged with `algorithm`.
    pub fn for_algorithm(algorithm: &'static str) -> Self {
        Self {
            algorithm: Cow::Borrowed(algorithm),
            ..Self::default()
        }
    }

    /// Records elapsed wall time since `started_at`, saturating at `u64::MAX`.
    pub fn record_runtime(&mut self, started_at: Instant) {
        let runtime_us = u64::try_from(started_at.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.runtime_us = Some(runtime_us);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
    use std::borrow::Cow;
    use std::time::Instant;

    #[test]
    fn diagnostics_default_sets_schema_and_engine_version() {
        let diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert_eq!(diagnostics.algorithm, Cow::Borrowed(""));
        assert!(diagnostics.runtime_us.is_none());
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn notes_warnings_and_runtime_accumulate() {
        let mut diagnostics = Diagnostics::for_algorithm("lag_correlation");
        diagnostics.note("lag=3");
        diagnostics.warn("inputs truncated");
        diagnostics.record_runtime(Instant::now());

        assert_eq!(diagnostics.algorithm, Cow::Borrowed("lag_correlation"));
        assert_eq!(diagnostics.notes, vec!["lag=3".to_string()]);
        assert_eq!(diagnostics.warnings, vec!["inputs truncated".to_string()]);
        assert!(diagnostics.runtime_us.is_some());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip_preserves_all_fields() {
        let diagnostics = Diagnostics {
            runtime_us: Some(125),
            algorithm: Cow::Owned("adaptive_normalize".to_string()),
            notes: vec!["period=10".to_string()],
            warnings: vec!["trailing partial window of 3 samples not evaluated".to_string()],
            params_json: Some(serde_json::json!({ "period": 10, "step": 0.01 })),
            ..Diagnostics::default()
        };

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: Diagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
