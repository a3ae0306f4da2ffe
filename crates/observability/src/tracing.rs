//! Tracing/logging initialization.
//!
//! JSON lines on stdout, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default(DEFAULT_DIRECTIVE);
}

/// Like [`init`], but with a caller-chosen fallback when `RUST_LOG` is unset
/// or unparsable (e.g. `"procura_infra=debug,info"`).
pub fn init_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init();
        init_with_default("debug");
        ::tracing::info!(component = "observability", "tracing initialized");
    }
}
