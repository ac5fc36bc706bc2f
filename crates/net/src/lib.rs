//! Ethernet link endpoint that tunnels frames over a stream connection.
//!
//! A [`TapEndpoint`] is the only wire of an in-process network stack: frames
//! the stack sends are length-prefixed and written to the single active
//! peer connection, and frames read from the peer are delivered to the
//! attached [`NetworkDispatcher`].

mod acceptor;
pub mod codec;
mod config;
mod debug;
mod dispatcher;
mod endpoint;
mod error;
mod link;
mod rx;
mod session;
mod stats;

pub use acceptor::FrameListener;
pub use codec::LinkFrameCodec;
pub use config::{BridgeConfig, DEFAULT_MTU, ListenAddr, MacAddr};
pub use debug::{Direction, PacketSink, TracingPacketSink};
pub use dispatcher::NetworkDispatcher;
pub use endpoint::{Connection, TapEndpoint, TapEndpointBuilder};
pub use error::NetError;
pub use link::{LinkCapabilities, LinkEndpoint, Route};
pub use session::{BoxedWriter, ConnectionId, TransportSession};
pub use stats::{LinkStats, StatsSnapshot};

pub use smoltcp::wire::{EthernetAddress, EthernetProtocol};
