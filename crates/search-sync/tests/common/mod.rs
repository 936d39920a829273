//! Test infrastructure for the sync protocol.
//!
//! Provides fixtures and instrumented collaborators that record every call
//! and can be told to fail.

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;

/// Installs a log subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_sync=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
