//! Process-wide logging setup.
//!
//! The crate emits `tracing` events (added columns, reduced chunksizes,
//! skipped rows). Embedders with their own subscriber can ignore this
//! module entirely; standalone users call [`init_logging`] once before the
//! first operation.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a global `tracing` subscriber once.
///
/// The filter comes from the `TABSERT_LOG` environment variable (same
/// syntax as `RUST_LOG`), defaulting to `info`. Later calls, and calls made
/// after another subscriber was installed, are no-ops.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("TABSERT_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging();
        init_logging();
    }
}
