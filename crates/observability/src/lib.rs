//! Tracing and logging setup shared by procurement binaries.

/// Initialize process-wide tracing with the default `info` filter.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
