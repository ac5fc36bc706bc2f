//! Per-connection receive loop.

use crate::codec::{ETHERNET_HEADER_LEN, LENGTH_PREFIX_LEN, LinkFrameCodec};
use crate::debug::Direction;
use crate::endpoint::EndpointInner;
use crate::error::NetError;
use crate::session::ConnectionId;
use futures::StreamExt;
use smoltcp::wire::EthernetFrame;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

/// Read frames from `reader` and deliver them until the connection fails.
///
/// Only returns with an error: end of stream, a malformed frame, or
/// cancellation through `closer` all terminate the loop.
pub(crate) async fn receive_loop<R>(
    reader: R,
    endpoint: Arc<EndpointInner>,
    id: ConnectionId,
    closer: CancellationToken,
) -> Result<(), NetError>
where
    R: AsyncRead + Unpin,
{
    let codec = LinkFrameCodec::for_mtu(endpoint.mtu);
    let capacity = LENGTH_PREFIX_LEN + codec.max_frame_len();
    let mut frames = FramedRead::with_capacity(reader, codec, capacity);

    loop {
        let next = tokio::select! {
            _ = closer.cancelled() => {
                return Err(NetError::Connection("connection closed locally".to_string()));
            }
            next = frames.next() => next,
        };

        let frame = match next {
            Some(frame) => frame?,
            None => return Err(NetError::Connection("peer closed connection".to_string())),
        };

        dispatch(&endpoint, id, &frame)?;
    }
}

fn dispatch(endpoint: &EndpointInner, id: ConnectionId, frame: &[u8]) -> Result<(), NetError> {
    if frame.is_empty() {
        return Err(NetError::EmptyFrame);
    }

    if let Some(sink) = &endpoint.packet_sink {
        sink.record(Direction::Inbound, frame);
    }

    let eth = EthernetFrame::new_checked(frame).map_err(|_| NetError::Truncated(frame.len()))?;

    let Some(dispatcher) = endpoint.dispatcher.get() else {
        tracing::trace!(connection = %id, len = frame.len(), "no dispatcher attached, dropping frame");
        return Ok(());
    };

    endpoint.stats.add_received(frame.len());
    tracing::trace!(
        connection = %id,
        len = frame.len(),
        src = %eth.src_addr(),
        dst = %eth.dst_addr(),
        "delivering frame"
    );
    dispatcher.deliver_network_packet(
        eth.src_addr(),
        eth.dst_addr(),
        eth.ethertype(),
        &frame[ETHERNET_HEADER_LEN..],
    );
    Ok(())
}
