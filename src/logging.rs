//! Logging init for the binaries.
//!
//! The library logs through the `log` facade. The binaries install a
//! `tracing-subscriber` fmt subscriber on stderr; its `tracing-log` bridge
//! picks up those records, so stdout stays reserved for results.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,storefront_probe=debug";

/// Quieter default for the CLI, whose stdout is the report itself.
pub const CLI_DEFAULT_FILTER: &str = "warn";

/// Initialize logging to stderr. `RUST_LOG` overrides `default_filter`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
