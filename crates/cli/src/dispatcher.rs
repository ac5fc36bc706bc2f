use std::sync::atomic::{AtomicU64, Ordering};
use tapbridge_net::{EthernetAddress, EthernetProtocol, NetworkDispatcher};

/// Dispatcher that logs every delivered packet.
///
/// Stands in for a network stack so the bridge can be exercised on its own.
#[derive(Debug, Default)]
pub struct TraceDispatcher {
    packets: AtomicU64,
}

impl TraceDispatcher {
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }
}

impl NetworkDispatcher for TraceDispatcher {
    fn deliver_network_packet(
        &self,
        src: EthernetAddress,
        dst: EthernetAddress,
        protocol: EthernetProtocol,
        payload: &[u8],
    ) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%src, %dst, %protocol, len = payload.len(), "packet delivered");
    }
}
