//! Test infrastructure for the flare workspace.
//!
//! Provides a mock ingestion endpoint with canned acknowledgements, request
//! capture that transparently undoes body compression, and packet fixtures.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod server;

pub use fixtures::{packet_for, sample_packet, PROJECT_ID};
pub use server::{MockIngestServer, MockResponse, RecordedRequest};

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to `error` so test output stays quiet.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_test_writer()
        .try_init();
}
