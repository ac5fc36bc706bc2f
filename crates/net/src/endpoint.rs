//! Ethernet link endpoint tunnelled over a stream connection.

use crate::codec::ETHERNET_HEADER_LEN;
use crate::config::{BridgeConfig, DEFAULT_MTU, validate_mtu};
use crate::debug::{Direction, PacketSink, TracingPacketSink};
use crate::dispatcher::{DispatcherSlot, NetworkDispatcher};
use crate::error::NetError;
use crate::link::{LinkCapabilities, LinkEndpoint, Route};
use crate::rx::receive_loop;
use crate::session::{ConnectionId, TransportSession};
use crate::stats::{LinkStats, StatsSnapshot};
use async_trait::async_trait;
use bytes::Bytes;
use smoltcp::wire::{ArpHardware, EthernetAddress, EthernetFrame, EthernetProtocol, EthernetRepr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// State shared between the endpoint handle and its connection tasks.
pub(crate) struct EndpointInner {
    pub(crate) mac: EthernetAddress,
    pub(crate) mtu: u32,
    pub(crate) session: TransportSession,
    pub(crate) stats: Arc<LinkStats>,
    pub(crate) dispatcher: DispatcherSlot,
    pub(crate) packet_sink: Option<Arc<dyn PacketSink>>,
}

/// A virtual ethernet interface whose wire is a single peer connection.
///
/// Outbound packets from the attached stack are framed and written to the
/// active connection; frames read from any live connection are delivered
/// to the attached dispatcher. Cloning yields another handle to the same
/// endpoint.
#[derive(Clone)]
pub struct TapEndpoint {
    inner: Arc<EndpointInner>,
}

/// Builder for [`TapEndpoint`].
pub struct TapEndpointBuilder {
    mac: EthernetAddress,
    mtu: u32,
    packet_sink: Option<Arc<dyn PacketSink>>,
}

impl TapEndpointBuilder {
    pub fn mac(mut self, mac: impl Into<EthernetAddress>) -> Self {
        self.mac = mac.into();
        self
    }

    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = mtu;
        self
    }

    /// Log every frame through `tracing` when enabled.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.packet_sink = if enabled {
            Some(Arc::new(TracingPacketSink))
        } else {
            None
        };
        self
    }

    /// Observe every frame with a custom sink.
    pub fn packet_sink(mut self, sink: Arc<dyn PacketSink>) -> Self {
        self.packet_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<TapEndpoint, NetError> {
        validate_mtu(self.mtu)?;

        let stats = Arc::new(LinkStats::default());
        Ok(TapEndpoint {
            inner: Arc::new(EndpointInner {
                mac: self.mac,
                mtu: self.mtu,
                session: TransportSession::new(stats.clone()),
                stats,
                dispatcher: DispatcherSlot::default(),
                packet_sink: self.packet_sink,
            }),
        })
    }
}

/// A connection adopted by an endpoint, supervised by its own task.
pub struct Connection {
    id: ConnectionId,
    task: JoinHandle<Result<(), NetError>>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the connection's receive loop to end and return its cause.
    pub async fn join(self) -> Result<(), NetError> {
        self.task
            .await
            .map_err(|e| NetError::Connection(format!("connection task failed: {e}")))?
    }
}

impl TapEndpoint {
    pub fn builder() -> TapEndpointBuilder {
        TapEndpointBuilder {
            mac: EthernetAddress([0x52, 0x54, 0x00, 0x00, 0x00, 0x01]),
            mtu: DEFAULT_MTU,
            packet_sink: None,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, NetError> {
        config.validate()?;
        Self::builder()
            .mac(config.mac)
            .mtu(config.mtu)
            .debug(config.debug)
            .build()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Whether a peer connection is currently active.
    pub async fn is_connected(&self) -> bool {
        self.inner.session.is_connected().await
    }

    pub async fn active_connection(&self) -> Option<ConnectionId> {
        self.inner.session.active_connection().await
    }

    /// Make `stream` the active connection and start its receive loop.
    ///
    /// The previous connection, if any, stops receiving outbound frames but
    /// keeps delivering inbound ones until its own read fails. When the
    /// receive loop ends, the connection is cleared from the session only
    /// if it is still the active one.
    pub async fn adopt_connection<S>(&self, stream: S) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let closer = CancellationToken::new();
        let id = self
            .inner
            .session
            .set_active(Box::new(writer), closer.clone())
            .await;
        debug!(connection = %id, "connection active");

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let rx = tokio::spawn(receive_loop(reader, inner.clone(), id, closer.clone()));
            let result = match rx.await {
                Ok(result) => result,
                Err(e) => Err(NetError::Connection(format!("receive loop failed: {e}"))),
            };

            if let Err(ref e) = result {
                warn!(connection = %id, error = %e, "cannot receive packets");
            }
            if inner.session.clear_if_active(id).await {
                debug!(connection = %id, "connection cleared");
            }
            closer.cancel();
            result
        });

        Connection { id, task }
    }

    fn ethernet_header(&self, route: &Route, protocol: EthernetProtocol) -> [u8; ETHERNET_HEADER_LEN] {
        let repr = EthernetRepr {
            src_addr: route.local_link_address.unwrap_or(self.inner.mac),
            dst_addr: route.remote_link_address,
            ethertype: protocol,
        };
        let mut header = [0u8; ETHERNET_HEADER_LEN];
        repr.emit(&mut EthernetFrame::new_unchecked(&mut header[..]));
        header
    }
}

#[async_trait]
impl LinkEndpoint for TapEndpoint {
    fn attach(&self, dispatcher: &Arc<dyn NetworkDispatcher>) {
        self.inner.dispatcher.attach(dispatcher);
    }

    fn detach(&self) {
        self.inner.dispatcher.detach();
    }

    fn is_attached(&self) -> bool {
        self.inner.dispatcher.is_attached()
    }

    fn capabilities(&self) -> LinkCapabilities {
        LinkCapabilities::RESOLUTION_REQUIRED | LinkCapabilities::RX_CHECKSUM_OFFLOAD
    }

    fn link_address(&self) -> EthernetAddress {
        self.inner.mac
    }

    fn mtu(&self) -> u32 {
        self.inner.mtu
    }

    fn max_header_length(&self) -> u16 {
        ETHERNET_HEADER_LEN as u16
    }

    fn arp_hardware_type(&self) -> ArpHardware {
        ArpHardware::Ethernet
    }

    async fn write_packet(
        &self,
        route: &Route,
        protocol: EthernetProtocol,
        payload: &[u8],
    ) -> Result<(), NetError> {
        let header = self.ethernet_header(route, protocol);

        if let Some(sink) = &self.inner.packet_sink {
            let mut frame = Vec::with_capacity(header.len() + payload.len());
            frame.extend_from_slice(&header);
            frame.extend_from_slice(payload);
            sink.record(Direction::Outbound, &frame);
        }

        if let Err(e) = self.inner.session.send(&header, payload).await {
            error!(error = %e, "cannot send packets");
            return Err(NetError::Aborted);
        }
        Ok(())
    }

    async fn write_packets(
        &self,
        _route: &Route,
        _protocol: EthernetProtocol,
        _packets: &[Bytes],
    ) -> Result<usize, NetError> {
        Err(NetError::Unsupported("batched packet writes"))
    }

    async fn write_raw_packet(&self, _frame: &[u8]) -> Result<(), NetError> {
        Err(NetError::Unsupported("raw packet writes"))
    }
}
