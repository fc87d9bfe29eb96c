//! Tracing and logging setup shared by every blogbus service.

/// Initialize process-wide logging with the default `info` filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
