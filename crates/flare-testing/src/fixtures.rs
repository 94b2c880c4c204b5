//! Packet fixtures.

use flare_core::{Capture, CaptureContext, JsonPacketFactory, Level, Packet, PacketFactory};

/// Project id used by every mock ingestion server.
pub const PROJECT_ID: &str = "42";

/// Creates an error-level message packet for `PROJECT_ID`.
pub fn sample_packet(message: &str) -> Packet {
    packet_for(Capture::message(message), CaptureContext::with_level(Level::Error))
}

/// Creates a packet for `PROJECT_ID` from an arbitrary capture.
pub fn packet_for(capture: Capture, context: CaptureContext) -> Packet {
    JsonPacketFactory::new().create(PROJECT_ID, capture, context)
}
