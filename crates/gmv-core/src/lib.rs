// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for gmv-rs: validated signal views, the shared error type,
//! run diagnostics and the execution context with its observer hooks.

pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod observability;
pub mod signal;

pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
pub use error::{GmvError, Operand};
pub use execution_context::ExecutionContext;
pub use observability::{ProgressSink, TelemetrySink};
pub use signal::{DTypeView, SignalView};
