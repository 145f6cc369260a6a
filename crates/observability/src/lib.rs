//! Logging setup shared by the binaries and tests.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing subscriber configuration (filters, output format).
pub mod tracing;
