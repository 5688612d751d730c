//! Tracing/logging setup shared by the fieldline binaries.

/// Initialize process-wide logging with the default `info` level.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVE);
}

/// Like [`init`], with a caller-chosen fallback when `RUST_LOG` is unset.
pub fn init_with_default(directive: &str) {
    tracing::init(directive);
}

/// Subscriber configuration (filters, layers).
pub mod tracing;
