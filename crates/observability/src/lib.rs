//! Tracing and logging (shared setup).

/// Initialize process-wide logging: JSON lines, filtered by `RUST_LOG` (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::Json, tracing::DEFAULT_FILTER);
}

/// Subscriber configuration (format, filter).
pub mod tracing;
