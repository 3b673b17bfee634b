//! Codec for the 54-byte announce/keepalive packet.
//!
//! Layout (all offsets fixed):
//!
//! | offset | len | field |
//! |--------|-----|-------|
//! | 0x00   | 10  | packet magic |
//! | 0x0a   | 2   | kind (0x06 0x00 = announce) |
//! | 0x0c   | 20  | device name, NUL padded |
//! | 0x20   | 4   | subtype / version / length |
//! | 0x24   | 1   | device id |
//! | 0x26   | 6   | MAC address |
//! | 0x2c   | 4   | IPv4 address |
//! | 0x30   | 4   | fixed |
//! | 0x34   | 1   | device type |

use std::net::Ipv4Addr;

use crate::device::{Device, DeviceType};
use crate::protocol_constants::{
    ANNOUNCE_PACKET_LEN, ANNOUNCE_PAD_A, ANNOUNCE_PAD_B, KIND_ANNOUNCE, PACKET_MAGIC,
};

use super::{ProtocolError, ProtocolResult};

/// Width of the NUL-padded name field.
const NAME_LEN: usize = 20;

/// Truncates `name` to at most [`NAME_LEN`] bytes without splitting a
/// UTF-8 sequence.
fn clip_name(name: &str) -> &[u8] {
    let mut end = 0;
    for (idx, ch) in name.char_indices() {
        if idx + ch.len_utf8() > NAME_LEN {
            break;
        }
        end = idx + ch.len_utf8();
    }
    &name.as_bytes()[..end]
}

/// Serializes an announce packet for `device`.
///
/// Names longer than 20 bytes are clipped; everything else is taken
/// verbatim from the device identity.
pub fn announce_packet(device: &Device) -> [u8; ANNOUNCE_PACKET_LEN] {
    let mut pkt = [0u8; ANNOUNCE_PACKET_LEN];

    pkt[0x00..0x0a].copy_from_slice(&PACKET_MAGIC);
    pkt[0x0a] = KIND_ANNOUNCE;

    let name = clip_name(&device.name);
    pkt[0x0c..0x0c + name.len()].copy_from_slice(name);

    pkt[0x20..0x24].copy_from_slice(&ANNOUNCE_PAD_A);
    pkt[0x24] = device.id;
    pkt[0x26..0x2c].copy_from_slice(&device.mac);
    pkt[0x2c..0x30].copy_from_slice(&device.ip.octets());
    pkt[0x30..0x34].copy_from_slice(&ANNOUNCE_PAD_B);
    pkt[0x34] = device.device_type.to_byte();

    pkt
}

/// Parses an announce packet into a [`Device`].
///
/// Rejects buffers that are shorter than the fixed layout, do not open
/// with the packet magic, or carry a kind byte other than announce.
pub fn parse_announce(buf: &[u8]) -> ProtocolResult<Device> {
    if buf.len() < ANNOUNCE_PACKET_LEN {
        return Err(ProtocolError::Truncated {
            expected: ANNOUNCE_PACKET_LEN,
            actual: buf.len(),
        });
    }
    if buf[0x00..0x0a] != PACKET_MAGIC {
        return Err(ProtocolError::BadMagic);
    }
    if buf[0x0a] != KIND_ANNOUNCE {
        return Err(ProtocolError::WrongKind(buf[0x0a]));
    }

    let name = String::from_utf8_lossy(&buf[0x0c..0x0c + NAME_LEN])
        .trim_end_matches('\0')
        .to_string();

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[0x26..0x2c]);

    Ok(Device {
        name,
        id: buf[0x24],
        device_type: DeviceType::from_byte(buf[0x34]),
        mac,
        ip: Ipv4Addr::new(buf[0x2c], buf[0x2d], buf[0x2e], buf[0x2f]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> Device {
        Device {
            name: "CDJ-900".to_string(),
            id: 2,
            device_type: DeviceType::Player,
            mac: [0x00, 0xe0, 0x36, 0xd2, 0x68, 0xf8],
            ip: Ipv4Addr::new(192, 168, 1, 247),
        }
    }

    #[test]
    fn test_announce_wire_layout() {
        let pkt = announce_packet(&sample_device());

        assert_eq!(
            pkt.as_slice(),
            &[
                0x51, 0x73, 0x70, 0x74, 0x31, 0x57, /* Qspt1W */
                0x6d, 0x4a, 0x4f, 0x4c, 0x06, 0x00, 0x43, 0x44, /* mJOL..CD */
                0x4a, 0x2d, 0x39, 0x30, 0x30, 0x00, 0x00, 0x00, /* J-900... */
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, /* ........ */
                0x00, 0x00, 0x01, 0x02, 0x00, 0x36, 0x02, 0x00, /* .....6.. */
                0x00, 0xe0, 0x36, 0xd2, 0x68, 0xf8, 0xc0, 0xa8, /* ..6.h... */
                0x01, 0xf7, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, /* ........ */
            ][..]
        );
    }

    #[test]
    fn test_round_trip() {
        let device = sample_device();
        let parsed = parse_announce(&announce_packet(&device)).unwrap();
        assert_eq!(parsed, device);
    }

    #[test]
    fn test_round_trip_full_width_name() {
        let device = Device {
            name: "X".repeat(20),
            ..sample_device()
        };
        let parsed = parse_announce(&announce_packet(&device)).unwrap();
        assert_eq!(parsed, device);
    }

    #[test]
    fn test_round_trip_unknown_type() {
        let device = Device {
            device_type: DeviceType::Other(0x07),
            ..sample_device()
        };
        let parsed = parse_announce(&announce_packet(&device)).unwrap();
        assert_eq!(parsed.device_type, DeviceType::Other(0x07));
    }

    #[test]
    fn test_overlong_name_is_clipped() {
        let device = Device {
            name: "an unreasonably long device name".to_string(),
            ..sample_device()
        };
        let parsed = parse_announce(&announce_packet(&device)).unwrap();
        assert_eq!(parsed.name, "an unreasonably long");
    }

    #[test]
    fn test_multibyte_name_clipped_on_char_boundary() {
        let device = Device {
            name: "ターンテーブルデッキ一号".to_string(), // 3 bytes per char
            ..sample_device()
        };
        let pkt = announce_packet(&device);
        let parsed = parse_announce(&pkt).unwrap();
        assert_eq!(parsed.name, "ターンテーブ");
    }

    #[test]
    fn test_short_packet_rejected() {
        let pkt = announce_packet(&sample_device());
        assert_eq!(
            parse_announce(&pkt[..53]),
            Err(ProtocolError::Truncated {
                expected: 54,
                actual: 53
            })
        );
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut pkt = announce_packet(&sample_device());
        pkt[0] = 0x00;
        assert_eq!(parse_announce(&pkt), Err(ProtocolError::BadMagic));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut pkt = announce_packet(&sample_device());
        pkt[0x0a] = 0x0a;
        assert_eq!(parse_announce(&pkt), Err(ProtocolError::WrongKind(0x0a)));
    }
}
