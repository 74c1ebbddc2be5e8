// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `GMV_LOG=gmv_align=debug`.
pub const LOG_ENV: &str = "GMV_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr fmt subscriber so stdout stays reserved for JSON output.
/// A second call is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
