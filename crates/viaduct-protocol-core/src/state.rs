use crate::pipeline::HopRef;
use bytes::BytesMut;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use viaduct_types::{PacketIdentifier, ProtocolVersion};

/// The closed set of per-connection capability kinds.
///
/// Adding a new kind of attached state means adding a tag here; each tag is
/// implemented by exactly one [`Capability`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityTag {
    /// Classic weather is currently snow.
    SnowTracker,
    /// Extensions announced by a Classic Protocol Extension server.
    CpeExtensions,
}

/// State that can be attached to a connection under its tag.
pub trait Capability: Any + Send + fmt::Debug {
    const TAG: CapabilityTag;
}

/// Per-connection capability store. At most one value per tag.
#[derive(Default)]
pub struct ConnectionState {
    entries: HashMap<CapabilityTag, Box<dyn Any + Send>>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `value`, returning whatever was attached under the same tag before.
    pub fn put<C: Capability>(&mut self, value: C) -> Option<C> {
        self.entries
            .insert(C::TAG, Box::new(value))
            .and_then(|old| old.downcast::<C>().ok())
            .map(|old| *old)
    }

    pub fn get<C: Capability>(&self) -> Option<&C> {
        self.entries.get(&C::TAG)?.downcast_ref::<C>()
    }

    pub fn get_mut<C: Capability>(&mut self) -> Option<&mut C> {
        self.entries.get_mut(&C::TAG)?.downcast_mut::<C>()
    }

    pub fn remove<C: Capability>(&mut self) -> Option<C> {
        let old = self.entries.remove(&C::TAG)?;
        old.downcast::<C>().ok().map(|old| *old)
    }

    pub fn contains<C: Capability>(&self) -> bool {
        self.get::<C>().is_some()
    }

    /// Tags currently attached, sorted.
    pub fn tags(&self) -> Vec<CapabilityTag> {
        let mut tags: Vec<_> = self.entries.keys().copied().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("tags", &self.tags())
            .finish()
    }
}

/// A packet created by a handler, waiting to enter the pipeline.
#[derive(Debug)]
pub struct InjectedPacket {
    pub identifier: PacketIdentifier,
    pub payload: BytesMut,
    pub target: HopRef,
}

/// Everything the pipeline knows about one connection.
///
/// Owned by the connection's task; handlers reach it through
/// [`PacketWrapper::user`](crate::PacketWrapper::user) and must look state up
/// again on every packet rather than holding on to it.
#[derive(Debug)]
pub struct UserConnection {
    id: u64,
    client_version: ProtocolVersion,
    server_version: ProtocolVersion,
    state: ConnectionState,
    outbox: Vec<InjectedPacket>,
}

impl UserConnection {
    pub fn new(id: u64, client_version: ProtocolVersion, server_version: ProtocolVersion) -> Self {
        Self {
            id,
            client_version,
            server_version,
            state: ConnectionState::new(),
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn client_version(&self) -> ProtocolVersion {
        self.client_version
    }

    pub fn server_version(&self) -> ProtocolVersion {
        self.server_version
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }

    pub fn put<C: Capability>(&mut self, value: C) -> Option<C> {
        self.state.put(value)
    }

    pub fn get<C: Capability>(&self) -> Option<&C> {
        self.state.get::<C>()
    }

    pub fn get_mut<C: Capability>(&mut self) -> Option<&mut C> {
        self.state.get_mut::<C>()
    }

    pub fn remove<C: Capability>(&mut self) -> Option<C> {
        self.state.remove::<C>()
    }

    pub fn has<C: Capability>(&self) -> bool {
        self.state.contains::<C>()
    }

    /// Drop all attached state. Called once the connection is gone.
    pub fn close(&mut self) {
        self.state.clear();
        self.outbox.clear();
    }

    pub(crate) fn queue(&mut self, packet: InjectedPacket) {
        self.outbox.push(packet);
    }

    pub(crate) fn drain_outbox(&mut self) -> std::vec::Drain<'_, InjectedPacket> {
        self.outbox.drain(..)
    }
}
