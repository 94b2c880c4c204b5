//! Best-effort event reporting for Sentry-compatible ingestion endpoints.
//!
//! `flare` captures messages and errors as event packets and delivers each
//! one in a single authenticated, optionally compressed HTTP request. A
//! failed delivery is logged and reported as `None`; it never becomes an
//! error in the application that is reporting.
//!
//! # Example
//!
//! ```no_run
//! use flare::{Config, Level, Reporter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! flare::telemetry::init_tracing(&config.rust_log)?;
//!
//! let reporter = Reporter::from_config(&config)?;
//! if let Some(id) = reporter.capture_message("nightly export finished", Level::Info).await {
//!     tracing::info!(%id, "Reported");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod reporter;
pub mod telemetry;

pub use config::Config;
pub use flare_core::{
    Capture, CaptureContext, CoreError, Dsn, EnvironmentPreparer, EventId, Level, Packet,
    PacketFactory, PacketPreparer, PatternScrubber, Scrubber,
};
pub use flare_transport::{
    FaultHandler, FaultKind, LoggingFaultHandler, SendFault, SilentFaultHandler, TransportConfig,
    Transmitter,
};
pub use reporter::Reporter;
