pub mod codec;
pub mod connection;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod state;
pub mod wire;
pub mod wrapper;

pub use codec::{CodecError, CodecResult};
pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use error::{ProtocolError, ProtocolResult};
pub use pipeline::{HopRef, Pipeline, ProtocolRegistry, ProtocolRegistryBuilder, TranslatedPacket};
pub use protocol::{HopId, PacketHandler, PacketHandlers, Protocol};
pub use state::{Capability, CapabilityTag, ConnectionState, UserConnection};
pub use wrapper::PacketWrapper;
