//! Big-endian UTF-16 string codec used by the remote database service.
//!
//! Wire format: a 4-byte big-endian code-unit count N, then N code
//! units of 2 bytes each, the last of which is a terminating NUL that
//! the protocol always includes in the count.
//!
//! Decoding is total: a hostile or truncated peer can shorten the
//! buffer or lie about the count, so the declared count is clamped to
//! what is actually present and invalid surrogate pairs become
//! U+FFFD instead of aborting the response.

/// Decodes a length-prefixed big-endian UTF-16 string.
///
/// Buffers too short to carry the count decode to the empty string.
pub fn decode_utf16_be(buf: &[u8]) -> String {
    if buf.len() < 4 {
        return String::new();
    }

    let declared = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let available = (buf.len() - 4) / 2;

    // The final counted unit is the terminating NUL.
    let take = declared.min(available).saturating_sub(1);

    let units: Vec<u16> = buf[4..]
        .chunks_exact(2)
        .take(take)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16_lossy(&units)
}

/// Encodes a string in the remote database's wire format.
pub fn encode_utf16_be(s: &str) -> Vec<u8> {
    let units: Vec<u16> = s.encode_utf16().collect();

    let mut out = Vec::with_capacity(4 + (units.len() + 1) * 2);
    out.extend_from_slice(&((units.len() + 1) as u32).to_be_bytes());
    for unit in &units {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0x00, 0x00]);
    out
}
