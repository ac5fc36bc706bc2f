//! The packet I/O contract between a network stack and a link endpoint.

use crate::dispatcher::NetworkDispatcher;
use crate::error::NetError;
use async_trait::async_trait;
use bitflags::bitflags;
use bytes::Bytes;
use smoltcp::wire::{ArpHardware, EthernetAddress, EthernetProtocol};
use std::sync::Arc;

bitflags! {
    /// Features a link endpoint advertises to the stack.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LinkCapabilities: u8 {
        /// The stack must resolve link addresses (ARP) before sending.
        const RESOLUTION_REQUIRED = 1 << 0;
        /// Inbound checksums are not validated by the link.
        const RX_CHECKSUM_OFFLOAD = 1 << 1;
    }
}

/// Link-layer addressing for one outbound packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    /// Source address; the endpoint's own address is used when unset.
    pub local_link_address: Option<EthernetAddress>,
    /// Destination address.
    pub remote_link_address: EthernetAddress,
}

impl Route {
    pub fn new(remote_link_address: EthernetAddress) -> Self {
        Self {
            local_link_address: None,
            remote_link_address,
        }
    }

    pub fn with_local(mut self, local_link_address: EthernetAddress) -> Self {
        self.local_link_address = Some(local_link_address);
        self
    }
}

/// An interface a network stack can attach to and send packets through.
#[async_trait]
pub trait LinkEndpoint: Send + Sync {
    /// Attach the dispatcher that receives inbound packets.
    ///
    /// The endpoint keeps a non-owning reference; delivery stops once the
    /// caller drops its last `Arc`.
    fn attach(&self, dispatcher: &Arc<dyn NetworkDispatcher>);

    /// Drop the reference to the attached dispatcher.
    fn detach(&self);

    fn is_attached(&self) -> bool;

    fn capabilities(&self) -> LinkCapabilities;

    fn link_address(&self) -> EthernetAddress;

    fn mtu(&self) -> u32;

    /// Bytes the stack must reserve in front of each packet for link headers.
    fn max_header_length(&self) -> u16;

    fn arp_hardware_type(&self) -> ArpHardware;

    /// Send one packet, adding the link header.
    async fn write_packet(
        &self,
        route: &Route,
        protocol: EthernetProtocol,
        payload: &[u8],
    ) -> Result<(), NetError>;

    /// Send a batch of packets; returns how many were written.
    async fn write_packets(
        &self,
        route: &Route,
        protocol: EthernetProtocol,
        packets: &[Bytes],
    ) -> Result<usize, NetError>;

    /// Send a frame that already carries its link header.
    async fn write_raw_packet(&self, frame: &[u8]) -> Result<(), NetError>;
}
