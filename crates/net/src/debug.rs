//! Optional packet introspection for debugging.

use smoltcp::wire::{EthernetFrame, PrettyPrinter};
use std::fmt;

/// Which way a frame crossed the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// From the attached stack towards the peer.
    Outbound,
    /// From the peer towards the attached stack.
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("tx"),
            Direction::Inbound => f.write_str("rx"),
        }
    }
}

/// Side channel that observes every frame crossing the link.
///
/// Implementations must return quickly and must not panic: `record` runs
/// inline on the send and receive paths.
pub trait PacketSink: Send + Sync {
    fn record(&self, direction: Direction, frame: &[u8]);
}

/// Renders frames as decoded ethernet packets through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPacketSink;

impl PacketSink for TracingPacketSink {
    fn record(&self, direction: Direction, frame: &[u8]) {
        let packet = PrettyPrinter::<EthernetFrame<&[u8]>>::new("", &frame);
        tracing::info!(%direction, len = frame.len(), "{}", packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Outbound.to_string(), "tx");
        assert_eq!(Direction::Inbound.to_string(), "rx");
    }

    #[test]
    fn pretty_printer_handles_malformed_frames() {
        // Shorter than an ethernet header; must render an error, not panic.
        let frame = [0u8; 6];
        TracingPacketSink.record(Direction::Inbound, &frame);

        let mut arp = vec![0xFF; 6];
        arp.extend_from_slice(&[0x52, 0x54, 0x00, 0x00, 0x00, 0x01]);
        arp.extend_from_slice(&[0x08, 0x06]);
        arp.extend_from_slice(&[0u8; 4]);
        TracingPacketSink.record(Direction::Outbound, &arp);
    }
}
