use smoltcp::wire::{EthernetAddress, EthernetProtocol};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Consumer of inbound packets, implemented by the attached network stack.
pub trait NetworkDispatcher: Send + Sync {
    /// Deliver one inbound packet with the ethernet header already stripped.
    ///
    /// Called synchronously from a connection's receive loop, once per frame.
    fn deliver_network_packet(
        &self,
        src: EthernetAddress,
        dst: EthernetAddress,
        protocol: EthernetProtocol,
        payload: &[u8],
    );
}

/// Non-owning reference to the attached dispatcher.
#[derive(Default)]
pub(crate) struct DispatcherSlot {
    inner: RwLock<Option<Weak<dyn NetworkDispatcher>>>,
}

impl DispatcherSlot {
    pub fn attach(&self, dispatcher: &Arc<dyn NetworkDispatcher>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Some(Arc::downgrade(dispatcher));
    }

    pub fn detach(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = None;
    }

    /// The attached dispatcher, if it is still alive.
    pub fn get(&self) -> Option<Arc<dyn NetworkDispatcher>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.get().is_some()
    }
}
