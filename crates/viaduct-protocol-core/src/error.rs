use crate::codec::CodecError;
use crate::protocol::HopId;
use thiserror::Error;
use viaduct_types::{Direction, ProtocolVersion};

/// Errors raised while building or running a translation pipeline.
///
/// Registration errors (`DuplicateRegistration`, `OverlappingShift`,
/// `DuplicateHop`) surface while the registry is constructed and abort startup.
/// `NoPath` rejects a single connection. Everything else is fatal to the
/// connection that raised it.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed packet: {0}")]
    Malformed(#[from] CodecError),

    #[error("{hop}: duplicate {direction} registration for packet 0x{id:02X}")]
    DuplicateRegistration {
        hop: HopId,
        direction: Direction,
        id: i32,
    },

    #[error("{hop}: {direction} id shift {start}..={end} overlaps an existing range")]
    OverlappingShift {
        hop: HopId,
        direction: Direction,
        start: i32,
        end: i32,
    },

    #[error("Hop {0} registered twice")]
    DuplicateHop(HopId),

    #[error("No protocol path from {from} to {to}")]
    NoPath {
        from: ProtocolVersion,
        to: ProtocolVersion,
    },

    #[error("Packet id already rewritten in this hop (0x{current:02X}, attempted 0x{attempted:02X})")]
    IdAlreadyRewritten { current: i32, attempted: i32 },

    #[error("Hop {0} is not part of this pipeline")]
    UnknownHop(String),

    #[error("Packet injection nested deeper than {0} levels")]
    InjectionDepthExceeded(usize),

    #[error("Handler failed: {0}")]
    Handler(#[from] anyhow::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
