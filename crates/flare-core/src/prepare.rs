//! Packet preparation hooks.
//!
//! The transport runs exactly one preparer over every packet before it is
//! serialized. A preparer may enrich metadata or refuse the packet; a refusal
//! is handled like any other send failure.

use std::collections::BTreeMap;

use crate::{error::Result, packet::Packet};

/// Finalizes a packet before transmission.
pub trait PacketPreparer: Send + Sync {
    /// Returns the packet to send, or an error to abort the send.
    fn prepare(&self, packet: Packet) -> Result<Packet>;
}

impl<F> PacketPreparer for F
where
    F: Fn(Packet) -> Result<Packet> + Send + Sync,
{
    fn prepare(&self, packet: Packet) -> Result<Packet> {
        self(packet)
    }
}

/// Fills in deployment metadata the packet does not already carry.
///
/// Values set on the packet always win over the preparer's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentPreparer {
    /// Release applied when the packet has none.
    pub release: Option<String>,
    /// Environment applied when the packet has none.
    pub environment: Option<String>,
    /// Server name applied when the packet has none.
    pub server_name: Option<String>,
    /// Tags merged underneath the packet's own tags.
    pub tags: BTreeMap<String, String>,
}

impl PacketPreparer for EnvironmentPreparer {
    fn prepare(&self, mut packet: Packet) -> Result<Packet> {
        if packet.release.is_none() {
            packet.release.clone_from(&self.release);
        }
        if packet.environment.is_none() {
            packet.environment.clone_from(&self.environment);
        }
        if packet.server_name.is_none() {
            packet.server_name.clone_from(&self.server_name);
        }
        for (key, value) in &self.tags {
            packet.tags.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(packet)
    }
}
