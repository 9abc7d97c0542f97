use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::{HopId, Protocol};
use crate::state::UserConnection;
use crate::wrapper::PacketWrapper;
use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use viaduct_types::{Direction, PacketIdentifier, ProtocolVersion};

/// Default bound on nested injections (a packet injected while handling an
/// injected packet, and so on).
pub const DEFAULT_MAX_INJECTION_DEPTH: usize = 8;

/// Where an injected packet enters the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopRef {
    /// The first hop in the packet's direction of travel.
    Start,
    /// The hop at this index of [`Pipeline::hops`], continuing in the
    /// packet's direction of travel.
    At(usize),
    /// The hop after the named one in the packet's direction of travel.
    /// The packet is already shaped like that hop's output.
    After(HopId),
}

impl From<usize> for HopRef {
    fn from(index: usize) -> Self {
        HopRef::At(index)
    }
}

impl From<HopId> for HopRef {
    fn from(hop: HopId) -> Self {
        HopRef::After(hop)
    }
}

impl fmt::Display for HopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HopRef::Start => f.write_str("start"),
            HopRef::At(index) => write!(f, "#{}", index),
            HopRef::After(hop) => write!(f, "after {}", hop),
        }
    }
}

/// A packet that made it through every hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedPacket {
    pub direction: Direction,
    pub id: i32,
    pub payload: Bytes,
}

/// An ordered chain of hops from `source` to `target`.
///
/// Clientbound packets travel first hop to last; serverbound packets travel
/// last hop to first.
pub struct Pipeline {
    source: ProtocolVersion,
    target: ProtocolVersion,
    hops: Vec<Arc<Protocol>>,
    max_injection_depth: usize,
}

impl Pipeline {
    pub fn source(&self) -> ProtocolVersion {
        self.source
    }

    pub fn target(&self) -> ProtocolVersion {
        self.target
    }

    pub fn hops(&self) -> &[Arc<Protocol>] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn position(&self, hop: HopId) -> Option<usize> {
        self.hops.iter().position(|p| p.id() == hop)
    }

    /// First hop index for a packet entering at `target`, or `None` when it
    /// enters past the last hop and goes straight out.
    fn entry(&self, direction: Direction, target: HopRef) -> ProtocolResult<Option<usize>> {
        match target {
            HopRef::Start => Ok(match direction {
                Direction::Clientbound => Some(0),
                Direction::Serverbound => Some(self.hops.len() - 1),
            }),
            HopRef::At(index) if index < self.hops.len() => Ok(Some(index)),
            HopRef::At(_) => Err(ProtocolError::UnknownHop(target.to_string())),
            HopRef::After(hop) => {
                let index = self
                    .position(hop)
                    .ok_or_else(|| ProtocolError::UnknownHop(hop.to_string()))?;
                Ok(self.next(direction, index))
            }
        }
    }

    fn next(&self, direction: Direction, index: usize) -> Option<usize> {
        match direction {
            Direction::Clientbound => Some(index + 1).filter(|&i| i < self.hops.len()),
            Direction::Serverbound => index.checked_sub(1),
        }
    }

    /// Translate one packet from the wire.
    ///
    /// Returns the packets to emit, in order: the packet itself unless a hop
    /// cancelled it, then everything handlers injected along the way, each
    /// followed by its own injections.
    pub fn process(
        &self,
        user: &mut UserConnection,
        direction: Direction,
        id: i32,
        payload: BytesMut,
    ) -> ProtocolResult<Vec<TranslatedPacket>> {
        let mut out = Vec::new();
        let start = self.entry(direction, HopRef::Start)?;
        self.process_from(
            user,
            PacketIdentifier::new(direction, id),
            payload,
            start,
            0,
            &mut out,
        )?;
        Ok(out)
    }

    fn process_from(
        &self,
        user: &mut UserConnection,
        identifier: PacketIdentifier,
        payload: BytesMut,
        start: Option<usize>,
        depth: usize,
        out: &mut Vec<TranslatedPacket>,
    ) -> ProtocolResult<()> {
        if depth > self.max_injection_depth {
            return Err(ProtocolError::InjectionDepthExceeded(self.max_injection_depth));
        }

        let direction = identifier.direction;
        let mut injected = Vec::new();
        let mut wrapper = PacketWrapper::inbound(identifier, payload, user);
        let mut position = start;

        while let Some(index) = position {
            self.hops[index].handle(&mut wrapper)?;
            injected.extend(wrapper.user().drain_outbox());
            if wrapper.is_cancelled() {
                trace!("{} cancelled at hop {}", identifier, self.hops[index].id());
                break;
            }
            wrapper.finish_hop();
            position = self.next(direction, index);
        }

        if wrapper.is_cancelled() {
            drop(wrapper);
        } else {
            let id = wrapper.id();
            out.push(TranslatedPacket {
                direction,
                id,
                payload: wrapper.into_payload().freeze(),
            });
        }

        for packet in injected {
            let start = self.entry(packet.identifier.direction, packet.target)?;
            trace!(
                "Injecting {} at {} (depth {})",
                packet.identifier,
                packet.target,
                depth + 1
            );
            self.process_from(user, packet.identifier, packet.payload, start, depth + 1, out)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("hops", &self.hops.iter().map(|h| h.id()).collect::<Vec<_>>())
            .finish()
    }
}

/// Collects hops before the registry is frozen.
pub struct ProtocolRegistryBuilder {
    hops: HashMap<ProtocolVersion, Vec<Arc<Protocol>>>,
    max_injection_depth: usize,
}

impl ProtocolRegistryBuilder {
    pub fn max_injection_depth(mut self, depth: usize) -> Self {
        self.max_injection_depth = depth;
        self
    }

    pub fn register(&mut self, protocol: Protocol) -> ProtocolResult<&mut Self> {
        let outgoing = self.hops.entry(protocol.source()).or_default();
        if outgoing.iter().any(|p| p.target() == protocol.target()) {
            return Err(ProtocolError::DuplicateHop(protocol.id()));
        }
        debug!("Registered hop {}", protocol.id());
        outgoing.push(Arc::new(protocol));
        Ok(self)
    }

    pub fn build(self) -> ProtocolRegistry {
        ProtocolRegistry {
            hops: self.hops,
            max_injection_depth: self.max_injection_depth,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

/// Every hop known to the process. Built once at startup and shared by all
/// connections; only the resolved-pipeline cache changes afterwards.
pub struct ProtocolRegistry {
    hops: HashMap<ProtocolVersion, Vec<Arc<Protocol>>>,
    max_injection_depth: usize,
    cache: RwLock<HashMap<(ProtocolVersion, ProtocolVersion), Arc<Pipeline>>>,
}

impl ProtocolRegistry {
    pub fn builder() -> ProtocolRegistryBuilder {
        ProtocolRegistryBuilder {
            hops: HashMap::new(),
            max_injection_depth: DEFAULT_MAX_INJECTION_DEPTH,
        }
    }

    pub fn hop_count(&self) -> usize {
        self.hops.values().map(Vec::len).sum()
    }

    /// Every version that appears at either end of a hop, oldest first.
    pub fn versions(&self) -> Vec<ProtocolVersion> {
        let mut versions: Vec<_> = self
            .hops
            .values()
            .flatten()
            .flat_map(|p| [p.source(), p.target()])
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    /// The hop chain turning `source`-shaped packets into `target`-shaped ones.
    ///
    /// Version history is linear, so this walks from `source` toward
    /// `target`, at each step taking the nearest hop that does not overshoot.
    pub fn resolve(
        &self,
        source: ProtocolVersion,
        target: ProtocolVersion,
    ) -> ProtocolResult<Arc<Pipeline>> {
        if let Some(pipeline) = self.cache.read().get(&(source, target)) {
            return Ok(pipeline.clone());
        }

        let no_path = || ProtocolError::NoPath {
            from: source,
            to: target,
        };
        if source == target {
            return Err(no_path());
        }

        let ascending = source < target;
        let mut current = source;
        let mut chain = Vec::new();
        while current != target {
            let candidates = self.hops.get(&current).into_iter().flatten().filter(|p| {
                if ascending {
                    p.target() > current && p.target() <= target
                } else {
                    p.target() < current && p.target() >= target
                }
            });
            let step = if ascending {
                candidates.min_by_key(|p| p.target())
            } else {
                candidates.max_by_key(|p| p.target())
            };
            let hop = step.ok_or_else(no_path)?;
            current = hop.target();
            chain.push(hop.clone());
        }

        let pipeline = Arc::new(Pipeline {
            source,
            target,
            hops: chain,
            max_injection_depth: self.max_injection_depth,
        });
        debug!("Resolved {:?}", pipeline);
        Ok(self
            .cache
            .write()
            .entry((source, target))
            .or_insert(pipeline)
            .clone())
    }

    pub fn supports(&self, source: ProtocolVersion, target: ProtocolVersion) -> bool {
        self.resolve(source, target).is_ok()
    }
}
