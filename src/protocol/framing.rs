//! Remote database message framing.
//!
//! Requests are a 6-byte separator, a 4-byte big-endian message id,
//! then the payload. Responses carry no length header: they interleave
//! framed sections that the reader accumulates until the buffer ends
//! with the final-section marker for the current message id, after
//! which [`split_sections`] recovers the individual sections.

use bytes::Bytes;

use crate::protocol_constants::{RD_FINAL_SECTION, RD_SEPARATOR};

use super::{ProtocolError, ProtocolResult};

/// Frames a request: separator, big-endian message id, payload.
pub fn frame_message(msg_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RD_SEPARATOR.len() + 4 + payload.len());
    out.extend_from_slice(&RD_SEPARATOR);
    out.extend_from_slice(&msg_id.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Builds the full framed final-section marker for `msg_id`.
///
/// A multi-section response is complete exactly when the accumulated
/// buffer ends with this byte sequence.
pub fn final_section_marker(msg_id: u32) -> Vec<u8> {
    frame_message(msg_id, &RD_FINAL_SECTION)
}

/// Splits `buf` on the separator, exactly like `str::split`: a leading
/// separator yields an empty first fragment.
fn split_on_separator(buf: &[u8]) -> Vec<&[u8]> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + RD_SEPARATOR.len() <= buf.len() {
        if buf[i..i + RD_SEPARATOR.len()] == RD_SEPARATOR {
            fragments.push(&buf[start..i]);
            i += RD_SEPARATOR.len();
            start = i;
        } else {
            i += 1;
        }
    }
    fragments.push(&buf[start..]);
    fragments
}

/// Recovers the data sections of a complete multi-section response.
///
/// The first two fragments (the empty fragment in front of the leading
/// separator plus the response preamble) and the trailing final-section
/// marker are discarded; every remaining section has its 4-byte message
/// id stripped.
pub fn split_sections(buf: &[u8]) -> ProtocolResult<Vec<Bytes>> {
    let fragments = split_on_separator(buf);
    if fragments.len() < 3 {
        return Err(ProtocolError::MissingSections);
    }

    fragments[2..fragments.len() - 1]
        .iter()
        .map(|fragment| {
            if fragment.len() < 4 {
                return Err(ProtocolError::ShortSection {
                    expected: 4,
                    actual: fragment.len(),
                });
            }
            Ok(Bytes::copy_from_slice(&fragment[4..]))
        })
        .collect()
}
