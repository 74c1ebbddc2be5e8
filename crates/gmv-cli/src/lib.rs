// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Support code for the `gmv` binary: array file I/O, settings files and logging.

pub mod arrays;
pub mod config;
pub mod error;
pub mod logging;

pub use arrays::{InputSummary, LoadedArray, load_array, load_pair, write_npy, write_npz};
pub use config::{FileConfig, load_config};
pub use error::CliError;
pub use logging::init_tracing;
