use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Release family of a protocol version. Families are ordered oldest first,
/// and every version of an older family sorts before any version of a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Classic,
    /// Classic with the Classic Protocol Extension handshake.
    ClassicExtended,
    Alpha,
    Beta,
    Release,
}

/// A specific release of the protocol.
///
/// Ordering and equality use `(kind, protocol)` only; `name` is for display
/// and config lookup.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolVersion {
    kind: VersionType,
    protocol: i32,
    name: &'static str,
}

impl ProtocolVersion {
    pub const C0_28_30: Self = Self::new(VersionType::Classic, 7, "c0.28-c0.30");
    pub const C0_30_CPE: Self = Self::new(VersionType::ClassicExtended, 7, "c0.30 CPE");
    pub const A1_0_15: Self = Self::new(VersionType::Alpha, 14, "a1.0.15");
    pub const B1_7_3: Self = Self::new(VersionType::Beta, 14, "b1.7-b1.7.3");
    pub const R1_8: Self = Self::new(VersionType::Release, 47, "1.8.x");
    pub const R1_12_2: Self = Self::new(VersionType::Release, 340, "1.12.2");
    pub const R1_19_3: Self = Self::new(VersionType::Release, 761, "1.19.3");
    pub const R1_19_4: Self = Self::new(VersionType::Release, 762, "1.19.4");
    pub const R1_20: Self = Self::new(VersionType::Release, 763, "1.20-1.20.1");
    pub const R1_20_2: Self = Self::new(VersionType::Release, 764, "1.20.2");

    /// Every version this crate knows by name, oldest first.
    pub const KNOWN: &'static [ProtocolVersion] = &[
        Self::C0_28_30,
        Self::C0_30_CPE,
        Self::A1_0_15,
        Self::B1_7_3,
        Self::R1_8,
        Self::R1_12_2,
        Self::R1_19_3,
        Self::R1_19_4,
        Self::R1_20,
        Self::R1_20_2,
    ];

    pub const fn new(kind: VersionType, protocol: i32, name: &'static str) -> Self {
        Self {
            kind,
            protocol,
            name,
        }
    }

    pub fn kind(&self) -> VersionType {
        self.kind
    }

    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a known version by its display name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name.trim()))
            .copied()
    }

    /// Look up a known release version by the number a client puts in its handshake.
    pub fn from_release_protocol(protocol: i32) -> Option<Self> {
        Self::KNOWN
            .iter()
            .find(|v| v.kind == VersionType::Release && v.protocol == protocol)
            .copied()
    }

    pub fn is_release(&self) -> bool {
        self.kind == VersionType::Release
    }

    pub fn older_than(&self, other: ProtocolVersion) -> bool {
        *self < other
    }

    pub fn older_than_or_equal_to(&self, other: ProtocolVersion) -> bool {
        *self <= other
    }

    pub fn newer_than(&self, other: ProtocolVersion) -> bool {
        *self > other
    }

    pub fn newer_than_or_equal_to(&self, other: ProtocolVersion) -> bool {
        *self >= other
    }

    pub fn between_inclusive(&self, low: ProtocolVersion, high: ProtocolVersion) -> bool {
        low <= *self && *self <= high
    }

    pub fn between_exclusive(&self, low: ProtocolVersion, high: ProtocolVersion) -> bool {
        low < *self && *self < high
    }
}

impl PartialEq for ProtocolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.protocol == other.protocol
    }
}

impl Eq for ProtocolVersion {}

impl Hash for ProtocolVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.protocol.hash(state);
    }
}

impl PartialOrd for ProtocolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProtocolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then(self.protocol.cmp(&other.protocol))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl std::str::FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown protocol version '{}'", s))
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_versions_are_sorted() {
        let known = ProtocolVersion::KNOWN;
        for pair in known.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_family_beats_protocol_number() {
        // Beta 14 is newer than Alpha 14, and any release is newer than both.
        assert!(ProtocolVersion::A1_0_15.older_than(ProtocolVersion::B1_7_3));
        assert!(ProtocolVersion::C0_30_CPE.newer_than(ProtocolVersion::C0_28_30));
        assert!(ProtocolVersion::R1_8.newer_than(ProtocolVersion::B1_7_3));
    }

    #[test]
    fn test_comparison_helpers() {
        let v = ProtocolVersion::R1_19_4;
        assert!(v.older_than_or_equal_to(ProtocolVersion::R1_19_4));
        assert!(v.newer_than_or_equal_to(ProtocolVersion::R1_19_3));
        assert!(v.between_inclusive(ProtocolVersion::R1_19_3, ProtocolVersion::R1_19_4));
        assert!(!v.between_exclusive(ProtocolVersion::R1_19_3, ProtocolVersion::R1_19_4));
        assert!(ProtocolVersion::R1_12_2.older_than_or_equal_to(ProtocolVersion::R1_19_3));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(
            ProtocolVersion::from_name("C0.30 cpe"),
            Some(ProtocolVersion::C0_30_CPE)
        );
        assert_eq!(
            ProtocolVersion::from_release_protocol(762),
            Some(ProtocolVersion::R1_19_4)
        );
        // Classic shares protocol 7 with nothing in the release family.
        assert_eq!(ProtocolVersion::from_release_protocol(7), None);
        assert!("2.0".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn test_serde_by_name() {
        #[derive(Deserialize, Serialize)]
        struct Holder {
            version: ProtocolVersion,
        }
        let holder: Holder = serde_json::from_str(r#"{"version":"1.19.3"}"#).unwrap();
        assert_eq!(holder.version, ProtocolVersion::R1_19_3);
        assert_eq!(
            serde_json::to_string(&holder).unwrap(),
            r#"{"version":"1.19.3"}"#
        );
    }
}
