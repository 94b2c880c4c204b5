//! Core domain types for the flare event reporting client.
//!
//! Provides the endpoint descriptor (DSN), the event packet model and its
//! factory, the preparation and scrubbing hooks consulted before a send, and
//! a clock abstraction for deterministic timestamps. The transport crate
//! depends on these types but never on how packets are built.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dsn;
pub mod error;
pub mod packet;
pub mod prepare;
pub mod scrub;
pub mod time;

pub use dsn::Dsn;
pub use error::{CoreError, Result};
pub use packet::{
    Capture, CaptureContext, EventId, ExceptionValue, JsonPacketFactory, Level, Packet,
    PacketFactory,
};
pub use prepare::{EnvironmentPreparer, PacketPreparer};
pub use scrub::{PatternScrubber, Scrubber};
pub use time::{Clock, RealClock, TestClock};
