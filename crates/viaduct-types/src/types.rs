use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a packet travels relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Server → client.
    Clientbound,
    /// Client → server.
    Serverbound,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Clientbound => Direction::Serverbound,
            Direction::Serverbound => Direction::Clientbound,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Clientbound => f.write_str("clientbound"),
            Direction::Serverbound => f.write_str("serverbound"),
        }
    }
}

/// A packet id within one direction of one protocol version.
///
/// The version itself is implied by where the packet currently sits in a
/// translation pipeline, so it is not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketIdentifier {
    pub direction: Direction,
    pub id: i32,
}

impl PacketIdentifier {
    pub const fn new(direction: Direction, id: i32) -> Self {
        Self { direction, id }
    }

    pub const fn clientbound(id: i32) -> Self {
        Self::new(Direction::Clientbound, id)
    }

    pub const fn serverbound(id: i32) -> Self {
        Self::new(Direction::Serverbound, id)
    }
}

impl fmt::Display for PacketIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0x{:02X}", self.direction, self.id)
    }
}

/// Text component for chat messages (simplified JSON text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextComponent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra: Vec<TextComponent>,
}

impl TextComponent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            extra: Vec::new(),
        }
    }

    pub fn colored(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::plain(text)
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"text":""}"#.to_string())
    }
}
