//! Device identity types shared across discovery and metadata lookup.
//!
//! A [`Device`] is the immutable identity a peer advertises in its
//! announce packets. Liveness bookkeeping (`last_seen`) is kept by the
//! device manager, not here, so two parses of the same announce compare
//! equal.

use std::net::Ipv4Addr;

use serde::Serialize;

/// Kind of link peer, as carried in the announce packet's type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    /// A physical player deck.
    Player,
    /// A mixer.
    Mixer,
    /// A rekordbox software instance posing as a device.
    Rekordbox,
    /// Anything else; the raw type byte is preserved for round-trips.
    Other(u8),
}

impl DeviceType {
    /// Parses the announce packet's type byte.
    pub fn from_byte(raw: u8) -> Self {
        match raw {
            0x01 => Self::Player,
            0x03 => Self::Mixer,
            0x04 => Self::Rekordbox,
            other => Self::Other(other),
        }
    }

    /// Returns the wire representation.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Player => 0x01,
            Self::Mixer => 0x03,
            Self::Rekordbox => 0x04,
            Self::Other(raw) => raw,
        }
    }

    /// Whether this peer serves a remote database worth linking to.
    ///
    /// Mixers announce themselves but have no track metadata to offer.
    pub fn has_remote_db(self) -> bool {
        matches!(self, Self::Player | Self::Rekordbox)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Mixer => write!(f, "mixer"),
            Self::Rekordbox => write!(f, "rekordbox"),
            Self::Other(raw) => write!(f, "other(0x{:02x})", raw),
        }
    }
}

/// A peer on the link network, discovered or synthetic.
///
/// `(mac, ip)` are immutable for the lifetime of a `Device` instance;
/// the device manager treats an announce with a known id but a
/// different MAC as a brand-new device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Device name as announced (up to 20 bytes on the wire).
    pub name: String,
    /// Player number. Real players use 1-4.
    pub id: u8,
    /// Kind of peer.
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    /// Hardware address of the announcing interface.
    pub mac: [u8; 6],
    /// IPv4 address the peer can be reached at.
    pub ip: Ipv4Addr,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} @ {}",
            self.name, self.id, self.device_type, self.ip
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_round_trip() {
        for raw in 0u8..=255 {
            assert_eq!(DeviceType::from_byte(raw).to_byte(), raw);
        }
    }

    #[test]
    fn test_device_type_classification() {
        assert_eq!(DeviceType::from_byte(0x01), DeviceType::Player);
        assert_eq!(DeviceType::from_byte(0x03), DeviceType::Mixer);
        assert_eq!(DeviceType::from_byte(0x04), DeviceType::Rekordbox);
        assert_eq!(DeviceType::from_byte(0x02), DeviceType::Other(0x02));
    }

    #[test]
    fn test_remote_db_eligibility() {
        assert!(DeviceType::Player.has_remote_db());
        assert!(DeviceType::Rekordbox.has_remote_db());
        assert!(!DeviceType::Mixer.has_remote_db());
        assert!(!DeviceType::Other(0x07).has_remote_db());
    }

    #[test]
    fn test_display() {
        let device = Device {
            name: "CDJ-2000NXS2".to_string(),
            id: 3,
            device_type: DeviceType::Player,
            mac: [0x00, 0xe0, 0x36, 0xd2, 0x68, 0xf8],
            ip: Ipv4Addr::new(192, 168, 1, 247),
        };
        assert_eq!(device.to_string(), "CDJ-2000NXS2 [3] player @ 192.168.1.247");
    }
}
