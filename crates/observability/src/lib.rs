//! Process-wide logging setup for embedders of the engine.
//!
//! The engine crates emit `tracing` events but never install a
//! subscriber; the hosting process decides how logs leave the
//! process. This crate is the default answer for binaries and tests.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber wiring (filter, format, writer).
pub mod tracing;
