//! 1.19.3 server to a 1.19.4 client.
//!
//! 1.19.4 inserted new clientbound packets (bundle delimiter, chunk biomes,
//! damage event, hurt animation) ahead of existing ones, so everything after
//! each insertion point moves up. Payloads of the packets handled here are
//! unchanged between the two versions.

use viaduct_protocol_core::{HopId, Protocol, ProtocolResult};
use viaduct_types::ProtocolVersion;

/// Clientbound id ranges (in 1.19.3 numbering) and how far each one moves.
const CLIENTBOUND_SHIFTS: &[(i32, i32, i32)] = &[
    (0x00, 0x0C, 1),
    (0x0D, 0x16, 2),
    (0x17, 0x1E, 3),
    (0x1F, 0x7F, 4),
];

pub fn hop_id() -> HopId {
    HopId::new(ProtocolVersion::R1_19_3, ProtocolVersion::R1_19_4)
}

pub fn protocol() -> ProtocolResult<Protocol> {
    let mut protocol = Protocol::new(ProtocolVersion::R1_19_3, ProtocolVersion::R1_19_4);
    for &(start, end, delta) in CLIENTBOUND_SHIFTS {
        protocol.shift_clientbound(start..=end, delta)?;
    }
    Ok(protocol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{r1_19_3, r1_19_4};
    use viaduct_types::Direction;

    #[test]
    fn test_known_packets_land_on_their_new_ids() {
        let protocol = protocol().unwrap();
        let pairs = [
            (r1_19_3::clientbound::DISCONNECT, r1_19_4::clientbound::DISCONNECT),
            (r1_19_3::clientbound::GAME_EVENT, r1_19_4::clientbound::GAME_EVENT),
            (r1_19_3::clientbound::KEEP_ALIVE, r1_19_4::clientbound::KEEP_ALIVE),
            (r1_19_3::clientbound::SYSTEM_CHAT, r1_19_4::clientbound::SYSTEM_CHAT),
        ];
        for (old, new) in pairs {
            assert_eq!(protocol.mapped_id(Direction::Clientbound, old), new);
        }
    }

    #[test]
    fn test_serverbound_unchanged() {
        let protocol = protocol().unwrap();
        assert_eq!(
            protocol.mapped_id(Direction::Serverbound, r1_19_3::serverbound::CHAT_MESSAGE),
            r1_19_3::serverbound::CHAT_MESSAGE
        );
    }
}
