//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the link protocol spoken by the players
//! and changing any of them breaks interoperability. Every opaque byte
//! blob the protocol carries lives here so wire-level changes can be
//! audited in one place.

// ─────────────────────────────────────────────────────────────────────────────
// Ports
// ─────────────────────────────────────────────────────────────────────────────

/// UDP port for device announce / keepalive broadcasts.
pub const ANNOUNCE_PORT: u16 = 50000;

/// UDP port for per-player status packets.
pub const STATUS_PORT: u16 = 50002;

/// TCP port of the fixed "which port is the remote database on" service
/// that every metadata-capable device exposes.
pub const DB_SERVER_QUERY_PORT: u16 = 12523;

// ─────────────────────────────────────────────────────────────────────────────
// Announce packet
// ─────────────────────────────────────────────────────────────────────────────

/// Magic header that opens every link packet ("Qspt1WmJOL").
pub const PACKET_MAGIC: [u8; 10] = [0x51, 0x73, 0x70, 0x74, 0x31, 0x57, 0x6d, 0x4a, 0x4f, 0x4c];

/// Packet-kind byte for the announce/keepalive packet (offset 0x0a).
pub const KIND_ANNOUNCE: u8 = 0x06;

/// Total length of an announce packet.
pub const ANNOUNCE_PACKET_LEN: usize = 0x36;

/// Fixed bytes between the device name and the device id
/// (subtype marker, protocol version, big-endian packet length 0x36).
pub const ANNOUNCE_PAD_A: [u8; 4] = [0x01, 0x02, 0x00, 0x36];

/// Fixed bytes between the IP address and the device type.
pub const ANNOUNCE_PAD_B: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Name the virtual player announces itself under (max 20 bytes).
///
/// Intentionally the crate name: it shows up verbatim on the peer
/// players' link screens, so consistency matters more than branding.
pub const VIRTUAL_PLAYER_NAME: &str = "djlink-core";

// ─────────────────────────────────────────────────────────────────────────────
// Remote database service
// ─────────────────────────────────────────────────────────────────────────────

/// Separator that prefixes every framed remote-DB message, requests and
/// response sections alike.
pub const RD_SEPARATOR: [u8; 6] = [0x11, 0x87, 0x23, 0x49, 0xae, 0x11];

/// Payload of the port-discovery query sent on [`DB_SERVER_QUERY_PORT`]:
/// big-endian length 0x0f, the ASCII service name, one NUL.
pub const RD_PORT_QUERY: [u8; 19] = [
    0x00, 0x00, 0x00, 0x0f, // length
    b'R', b'e', b'm', b'o', b't', b'e', b'D', b'B', b'S', b'e', b'r', b'v', b'e', b'r', // name
    0x00,
];

/// First handshake packet on a fresh remote-DB connection. The peer
/// replies with the same five bytes, which are discarded.
pub const RD_HELLO: [u8; 5] = [0x11, 0x00, 0x00, 0x00, 0x01];

/// Length of the reply to [`RD_HELLO`].
pub const RD_HELLO_REPLY_LEN: usize = 5;

/// Pseudo message id carried by the identification packet.
pub const RD_IDENTIFY_MSG_ID: [u8; 4] = [0xff, 0xff, 0xff, 0xfe];

/// Opaque body of the identification packet, sent between the pseudo
/// message id and the single requester-id byte.
pub const RD_IDENTIFY_PREAMBLE: [u8; 26] = [
    0x10, 0x00, 0x00, 0x0f, 0x01, 0x14, 0x00, 0x00, 0x00, 0x0c, 0x06, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00,
];

/// Length of both the identification reply and the acknowledgement the
/// peer sends after the first packet of a multi-message query.
pub const RD_ACK_LEN: usize = 42;

/// Fixed payload of the final section: framed with the current message
/// id, it marks the end of a multi-section response.
pub const RD_FINAL_SECTION: [u8; 22] = [
    0x10, 0x42, 0x01, 0x0f, 0x01, 0x14, 0x00, 0x00, 0x00, 0x0c, 0x06, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Opaque preamble of the first packet of a track metadata query
/// (opcode bytes 0x20 0x02).
pub const RD_TRACK_METADATA_PREAMBLE: [u8; 24] = [
    0x10, 0x20, 0x02, 0x0f, 0x02, 0x14, 0x00, 0x00, 0x00, 0x0c, 0x06, 0x06, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Opaque preamble of the first packet of a track path query
/// (opcode bytes 0x21 0x02).
pub const RD_TRACK_PATH_PREAMBLE: [u8; 24] = [
    0x10, 0x21, 0x02, 0x0f, 0x02, 0x14, 0x00, 0x00, 0x00, 0x0c, 0x06, 0x06, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Opaque preamble of the bulk (render) packet of a multi-message
/// query.
pub const RD_RENDER_PREAMBLE: [u8; 24] = [
    0x10, 0x30, 0x00, 0x0f, 0x06, 0x14, 0x00, 0x00, 0x00, 0x0c, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Render window arguments (offset 0, limit 32) appended to the bulk
/// packet after the query tuple.
pub const RD_RENDER_WINDOW: [u8; 10] = [
    0x11, 0x00, 0x00, 0x00, 0x00, // offset
    0x11, 0x00, 0x00, 0x00, 0x20, // limit
];

/// Opaque preamble of the artwork query (opcode bytes 0x20 0x03).
pub const RD_ARTWORK_PREAMBLE: [u8; 24] = [
    0x10, 0x20, 0x03, 0x0f, 0x02, 0x14, 0x00, 0x00, 0x00, 0x0c, 0x06, 0x06, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Length of the artwork response header; bytes [48..52] carry the
/// big-endian length of the JPEG data that follows.
pub const RD_ARTWORK_HEADER_LEN: usize = 52;

/// Offset inside a response section at which string fields start.
pub const RD_SECTION_STRING_OFFSET: usize = 38;
