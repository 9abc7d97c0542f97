use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::WireType;
use crate::wrapper::PacketWrapper;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::trace;
use viaduct_types::{Direction, ProtocolVersion};

/// One step of a handler chain.
pub type PacketHandler = Arc<dyn Fn(&mut PacketWrapper<'_>) -> ProtocolResult<()> + Send + Sync>;

/// Names a hop by the two versions it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HopId {
    pub source: ProtocolVersion,
    pub target: ProtocolVersion,
}

impl HopId {
    pub fn new(source: ProtocolVersion, target: ProtocolVersion) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for HopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Builder for an ordered handler chain.
///
/// ```ignore
/// PacketHandlers::new()
///     .passthrough(VarInt)
///     .read(Bool)
///     .handler(|wrapper| {
///         let flags = wrapper.read(UnsignedByte)?;
///         wrapper.write(Int, flags as i32)?;
///         Ok(())
///     })
/// ```
#[derive(Clone, Default)]
pub struct PacketHandlers {
    steps: Vec<PacketHandler>,
}

impl PacketHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut PacketWrapper<'_>) -> ProtocolResult<()> + Send + Sync + 'static,
    {
        self.steps.push(Arc::new(f));
        self
    }

    /// Copy one field unchanged.
    pub fn passthrough<T>(self, ty: T) -> Self
    where
        T: WireType + Send + Sync + 'static,
    {
        self.handler(move |wrapper| {
            wrapper.passthrough(ty)?;
            Ok(())
        })
    }

    /// Consume one field and drop it.
    pub fn read<T>(self, ty: T) -> Self
    where
        T: WireType + Send + Sync + 'static,
    {
        self.handler(move |wrapper| {
            wrapper.read(ty)?;
            Ok(())
        })
    }

    /// Append a constant field.
    pub fn write<T>(self, ty: T, value: T::Value) -> Self
    where
        T: WireType + Send + Sync + 'static,
        T::Value: Clone + Send + Sync + 'static,
    {
        self.handler(move |wrapper| {
            wrapper.write(ty, value.clone())?;
            Ok(())
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

struct Registration {
    new_id: Option<i32>,
    handlers: Vec<PacketHandler>,
}

#[derive(Debug, Clone)]
struct IdShift {
    range: RangeInclusive<i32>,
    delta: i32,
}

#[derive(Default)]
struct DirectionTable {
    registrations: HashMap<i32, Registration>,
    shifts: Vec<IdShift>,
}

impl DirectionTable {
    fn default_id(&self, id: i32) -> i32 {
        self.shifts
            .iter()
            .find(|shift| shift.range.contains(&id))
            .map_or(id, |shift| id + shift.delta)
    }
}

/// A single version hop.
///
/// Clientbound entries are keyed by the `source` version's ids and produce
/// `target` ids; serverbound entries are keyed by `target` ids and produce
/// `source` ids. Tables are filled once at startup and never change after the
/// hop is handed to a registry.
pub struct Protocol {
    id: HopId,
    clientbound: DirectionTable,
    serverbound: DirectionTable,
}

impl Protocol {
    pub fn new(source: ProtocolVersion, target: ProtocolVersion) -> Self {
        Self {
            id: HopId::new(source, target),
            clientbound: DirectionTable::default(),
            serverbound: DirectionTable::default(),
        }
    }

    pub fn id(&self) -> HopId {
        self.id
    }

    pub fn source(&self) -> ProtocolVersion {
        self.id.source
    }

    pub fn target(&self) -> ProtocolVersion {
        self.id.target
    }

    fn table(&self, direction: Direction) -> &DirectionTable {
        match direction {
            Direction::Clientbound => &self.clientbound,
            Direction::Serverbound => &self.serverbound,
        }
    }

    fn table_mut(&mut self, direction: Direction) -> &mut DirectionTable {
        match direction {
            Direction::Clientbound => &mut self.clientbound,
            Direction::Serverbound => &mut self.serverbound,
        }
    }

    /// Install the remapping and handler chain for one packet.
    /// `new_id == None` keeps the id as it is.
    pub fn register(
        &mut self,
        direction: Direction,
        old_id: i32,
        new_id: Option<i32>,
        handlers: PacketHandlers,
    ) -> ProtocolResult<()> {
        let hop = self.id;
        let table = self.table_mut(direction);
        if table.registrations.contains_key(&old_id) {
            return Err(ProtocolError::DuplicateRegistration {
                hop,
                direction,
                id: old_id,
            });
        }
        table.registrations.insert(
            old_id,
            Registration {
                new_id,
                handlers: handlers.steps,
            },
        );
        Ok(())
    }

    pub fn register_clientbound(
        &mut self,
        old_id: i32,
        new_id: Option<i32>,
        handlers: PacketHandlers,
    ) -> ProtocolResult<()> {
        self.register(Direction::Clientbound, old_id, new_id, handlers)
    }

    pub fn register_serverbound(
        &mut self,
        old_id: i32,
        new_id: Option<i32>,
        handlers: PacketHandlers,
    ) -> ProtocolResult<()> {
        self.register(Direction::Serverbound, old_id, new_id, handlers)
    }

    /// Id-only remap, no handlers.
    pub fn map_clientbound(&mut self, old_id: i32, new_id: i32) -> ProtocolResult<()> {
        self.register_clientbound(old_id, Some(new_id), PacketHandlers::new())
    }

    pub fn map_serverbound(&mut self, old_id: i32, new_id: i32) -> ProtocolResult<()> {
        self.register_serverbound(old_id, Some(new_id), PacketHandlers::new())
    }

    /// Default rule for unregistered ids: every id in `range` moves by `delta`.
    pub fn shift(
        &mut self,
        direction: Direction,
        range: RangeInclusive<i32>,
        delta: i32,
    ) -> ProtocolResult<()> {
        let hop = self.id;
        let table = self.table_mut(direction);
        let overlaps = table
            .shifts
            .iter()
            .any(|s| s.range.start() <= range.end() && range.start() <= s.range.end());
        if overlaps {
            return Err(ProtocolError::OverlappingShift {
                hop,
                direction,
                start: *range.start(),
                end: *range.end(),
            });
        }
        table.shifts.push(IdShift { range, delta });
        Ok(())
    }

    pub fn shift_clientbound(&mut self, range: RangeInclusive<i32>, delta: i32) -> ProtocolResult<()> {
        self.shift(Direction::Clientbound, range, delta)
    }

    pub fn shift_serverbound(&mut self, range: RangeInclusive<i32>, delta: i32) -> ProtocolResult<()> {
        self.shift(Direction::Serverbound, range, delta)
    }

    pub fn is_registered(&self, direction: Direction, id: i32) -> bool {
        self.table(direction).registrations.contains_key(&id)
    }

    /// The id a packet leaves this hop with when no handler rewrites it.
    pub fn mapped_id(&self, direction: Direction, id: i32) -> i32 {
        let table = self.table(direction);
        match table.registrations.get(&id) {
            Some(registration) => registration.new_id.unwrap_or(id),
            None => table.default_id(id),
        }
    }

    /// Run this hop over one packet.
    ///
    /// Unregistered packets keep their payload and only get the default id
    /// rule applied. Registered packets run every handler in order, even after
    /// one of them cancels, then take the table id unless a handler already
    /// rewrote it.
    pub fn handle(&self, wrapper: &mut PacketWrapper<'_>) -> ProtocolResult<()> {
        let direction = wrapper.direction();
        let id = wrapper.id();
        let table = self.table(direction);

        let Some(registration) = table.registrations.get(&id) else {
            let mapped = table.default_id(id);
            trace!(
                "{}: pass-through {} 0x{:02X} -> 0x{:02X}",
                self.id,
                direction,
                id,
                mapped
            );
            if mapped != id {
                wrapper.set_id(mapped)?;
            }
            return Ok(());
        };

        for handler in &registration.handlers {
            handler(wrapper)?;
        }
        if let Some(new_id) = registration.new_id {
            if !wrapper.id_rewritten() {
                wrapper.set_id(new_id)?;
            }
        }
        trace!(
            "{}: handled {} 0x{:02X} -> 0x{:02X}{}",
            self.id,
            direction,
            id,
            wrapper.id(),
            if wrapper.is_cancelled() { " (cancelled)" } else { "" }
        );
        Ok(())
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("id", &self.id)
            .field("clientbound", &self.clientbound.registrations.len())
            .field("serverbound", &self.serverbound.registrations.len())
            .finish()
    }
}
