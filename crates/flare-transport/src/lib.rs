//! Event transmission pipeline.
//!
//! Takes a finalized event packet and delivers it to an ingestion endpoint
//! on a best-effort, single-attempt basis:
//!
//! 1. **Prepare** - run the packet preparation hook
//! 2. **Authenticate** - build a fresh `X-Sentry-Auth` header
//! 3. **Serialize** - render compact JSON and pass it through the scrubber
//! 4. **Compress** - optionally stream the body through gzip
//! 5. **Send** - issue one POST bounded by the configured timeout
//! 6. **Decode** - extract the event id from the acknowledgement
//!
//! Any failure along the way is handed to the `FaultHandler` and turns into
//! a `None` result; `Transmitter::send` never returns an error.
//!
//! # Example
//!
//! ```no_run
//! use flare_core::{Capture, CaptureContext, Dsn, JsonPacketFactory, PacketFactory};
//! use flare_transport::{TransportConfig, Transmitter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dsn: Dsn = "https://public@ingest.example.com/1".parse()?;
//! let packet = JsonPacketFactory::new().create(
//!     dsn.project_id(),
//!     Capture::message("cache warmed"),
//!     CaptureContext::default(),
//! );
//!
//! let transmitter = Transmitter::new(TransportConfig::default())?;
//! if let Some(id) = transmitter.send(packet, &dsn).await {
//!     println!("accepted as {id}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod compression;
pub mod error;
pub mod fault;
pub mod response;

pub use client::{TransportConfig, Transmitter, TransmitterBuilder};
pub use compression::{CompressedBody, ContentEncoding, RequestBody};
pub use error::{Result, TransportError};
pub use fault::{FaultHandler, FaultKind, LoggingFaultHandler, SendFault, SilentFaultHandler};
