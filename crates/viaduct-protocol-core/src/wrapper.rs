use crate::codec::CodecResult;
use crate::error::{ProtocolError, ProtocolResult};
use crate::pipeline::HopRef;
use crate::state::{InjectedPacket, UserConnection};
use crate::wire::{FieldValue, WireType};
use bytes::BytesMut;
use viaduct_types::{Direction, PacketIdentifier};

/// Cursor over one packet as it moves through a hop.
///
/// Reads consume the input in wire order; writes append to the output. The
/// payload handed to the next hop is the output followed by whatever input
/// was never read, so a handler only touches the fields it cares about.
/// Reading fields out of order is not detected and yields garbage.
pub struct PacketWrapper<'a> {
    direction: Direction,
    id: i32,
    input: BytesMut,
    output: BytesMut,
    fields: Vec<FieldValue>,
    cancelled: bool,
    id_rewritten: bool,
    user: &'a mut UserConnection,
}

impl<'a> PacketWrapper<'a> {
    /// Wrap a packet that arrived from the wire or from an injection.
    pub fn inbound(
        identifier: PacketIdentifier,
        payload: BytesMut,
        user: &'a mut UserConnection,
    ) -> Self {
        Self {
            direction: identifier.direction,
            id: identifier.id,
            input: payload,
            output: BytesMut::new(),
            fields: Vec::new(),
            cancelled: false,
            id_rewritten: false,
            user,
        }
    }

    /// Start a brand-new packet, e.g. to inject alongside the one being handled.
    pub fn create(identifier: impl Into<PacketIdentifier>, user: &'a mut UserConnection) -> Self {
        Self::inbound(identifier.into(), BytesMut::new(), user)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn identifier(&self) -> PacketIdentifier {
        PacketIdentifier::new(self.direction, self.id)
    }

    pub fn read<T: WireType>(&mut self, ty: T) -> CodecResult<T::Value> {
        let value = ty.decode(&mut self.input)?;
        self.fields.push(ty.field(&value));
        Ok(value)
    }

    pub fn write<T: WireType>(&mut self, ty: T, value: T::Value) -> CodecResult<()> {
        ty.encode(&value, &mut self.output)?;
        Ok(())
    }

    /// Read a field and write it back unchanged.
    pub fn passthrough<T: WireType>(&mut self, ty: T) -> CodecResult<T::Value> {
        let value = self.read(ty)?;
        ty.encode(&value, &mut self.output)?;
        Ok(value)
    }

    /// Fields decoded in this hop, in read order.
    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    /// Unread input bytes.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Forget everything written so far.
    pub fn clear(&mut self) {
        self.output.clear();
    }

    /// Forget everything not yet read.
    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Give the packet a new id. Allowed once per hop.
    pub fn set_id(&mut self, id: i32) -> ProtocolResult<()> {
        if self.id_rewritten {
            return Err(ProtocolError::IdAlreadyRewritten {
                current: self.id,
                attempted: id,
            });
        }
        self.id = id;
        self.id_rewritten = true;
        Ok(())
    }

    pub fn id_rewritten(&self) -> bool {
        self.id_rewritten
    }

    pub fn user(&mut self) -> &mut UserConnection {
        self.user
    }

    /// Queue this packet to enter the pipeline at `target`.
    ///
    /// The packet is processed after the one currently being handled has
    /// finished its own traversal; packets sent from the same handler keep
    /// their send order.
    pub fn send(self, target: impl Into<HopRef>) {
        let identifier = self.identifier();
        let user = self.user;
        let mut payload = self.output;
        payload.unsplit(self.input);
        user.queue(InjectedPacket {
            identifier,
            payload,
            target: target.into(),
        });
    }

    /// Fold this hop's output back into the input for the next hop.
    pub(crate) fn finish_hop(&mut self) {
        let mut next = std::mem::take(&mut self.output);
        next.unsplit(std::mem::take(&mut self.input));
        self.input = next;
        self.fields.clear();
        self.id_rewritten = false;
    }

    pub(crate) fn into_payload(self) -> BytesMut {
        let mut payload = self.output;
        payload.unsplit(self.input);
        payload
    }
}

impl std::fmt::Debug for PacketWrapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketWrapper")
            .field("direction", &self.direction)
            .field("id", &self.id)
            .field("remaining", &self.input.len())
            .field("written", &self.output.len())
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
