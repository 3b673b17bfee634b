//! Remote database query payloads and response extraction.
//!
//! Requests are opaque preambles from [`crate::protocol_constants`]
//! followed by the query tuple `(requester, slot, selector, 0x11,
//! id_be32)`. Responses are positional: a fixed section index holds
//! each track field, with strings at a fixed in-section offset.

use bytes::Bytes;

use crate::protocol::strings::decode_utf16_be;
use crate::protocol::ProtocolError;
use crate::protocol_constants::{
    RD_ARTWORK_PREAMBLE, RD_RENDER_PREAMBLE, RD_RENDER_WINDOW, RD_SECTION_STRING_OFFSET,
    RD_TRACK_METADATA_PREAMBLE, RD_TRACK_PATH_PREAMBLE,
};

use super::RemoteDbResult;

/// Selector byte for metadata-shaped queries.
const SELECT_METADATA: u8 = 0x01;

/// Selector byte for the track path query.
const SELECT_PATH: u8 = 0x08;

/// Number of data sections a metadata response must carry for the
/// positional extraction below.
const METADATA_SECTION_COUNT: usize = 11;

/// Section index of the track path in a path response.
const PATH_SECTION: usize = 4;

/// The two payloads of a multi-message query, sharing one message id.
pub(crate) struct QueryParts {
    /// First packet; the peer acknowledges it with a fixed-size reply.
    pub initial: Vec<u8>,
    /// Bulk packet; the peer answers with a stream of sections.
    pub bulk: Vec<u8>,
}

/// Appends the query tuple to a preamble.
fn with_tuple(preamble: &[u8], requester: u8, slot: u8, selector: u8, id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(preamble.len() + 9);
    out.extend_from_slice(preamble);
    out.push(0x11);
    out.push(requester);
    out.push(slot);
    out.push(selector);
    out.push(0x11);
    out.extend_from_slice(&id.to_be_bytes());
    out
}

/// Builds both packets of a track metadata query.
pub(crate) fn track_metadata_query(requester: u8, slot: u8, track_id: u32) -> QueryParts {
    let mut bulk = with_tuple(&RD_RENDER_PREAMBLE, requester, slot, SELECT_METADATA, track_id);
    bulk.extend_from_slice(&RD_RENDER_WINDOW);
    QueryParts {
        initial: with_tuple(
            &RD_TRACK_METADATA_PREAMBLE,
            requester,
            slot,
            SELECT_METADATA,
            track_id,
        ),
        bulk,
    }
}

/// Builds both packets of a track path query.
pub(crate) fn track_path_query(requester: u8, slot: u8, track_id: u32) -> QueryParts {
    let mut bulk = with_tuple(&RD_RENDER_PREAMBLE, requester, slot, SELECT_PATH, track_id);
    bulk.extend_from_slice(&RD_RENDER_WINDOW);
    QueryParts {
        initial: with_tuple(
            &RD_TRACK_PATH_PREAMBLE,
            requester,
            slot,
            SELECT_PATH,
            track_id,
        ),
        bulk,
    }
}

/// Builds the single-packet artwork query.
pub(crate) fn artwork_query(requester: u8, slot: u8, artwork_id: u32) -> Vec<u8> {
    with_tuple(&RD_ARTWORK_PREAMBLE, requester, slot, SELECT_METADATA, artwork_id)
}

/// Track fields recovered from a metadata response, before the path and
/// artwork phases fill in the rest.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub comment: String,
    pub key: String,
    pub genre: String,
    pub label: String,
    pub length_secs: u32,
    /// 0 means the track has no artwork.
    pub artwork_id: u32,
}

/// Decodes the string field of a section (fixed in-section offset).
fn section_string(sections: &[Bytes], index: usize) -> RemoteDbResult<String> {
    let section = &sections[index];
    if section.len() < RD_SECTION_STRING_OFFSET {
        return Err(ProtocolError::ShortSection {
            expected: RD_SECTION_STRING_OFFSET,
            actual: section.len(),
        }
        .into());
    }
    Ok(decode_utf16_be(&section[RD_SECTION_STRING_OFFSET..]))
}

/// Reads a big-endian u32 at `offset` in a section.
fn section_u32(sections: &[Bytes], index: usize, offset: usize) -> RemoteDbResult<u32> {
    let section = &sections[index];
    if section.len() < offset + 4 {
        return Err(ProtocolError::ShortSection {
            expected: offset + 4,
            actual: section.len(),
        }
        .into());
    }
    Ok(u32::from_be_bytes([
        section[offset],
        section[offset + 1],
        section[offset + 2],
        section[offset + 3],
    ]))
}

/// Extracts track fields from the sections of a metadata response.
///
/// Positional layout: 0 title (artwork id in the trailing bytes),
/// 1 artist, 2 album, 3 length in seconds at [28..32], 5 comment,
/// 6 musical key, 9 genre, 10 label.
pub(crate) fn parse_track_metadata(sections: &[Bytes]) -> RemoteDbResult<TrackMetadata> {
    if sections.len() < METADATA_SECTION_COUNT {
        return Err(ProtocolError::MissingSections.into());
    }

    // The artwork id sits in the last 4 of section 0's trailing bytes.
    let artwork_id = section_u32(sections, 0, sections[0].len().saturating_sub(4))?;

    Ok(TrackMetadata {
        title: section_string(sections, 0)?,
        artist: section_string(sections, 1)?,
        album: section_string(sections, 2)?,
        length_secs: section_u32(sections, 3, 28)?,
        comment: section_string(sections, 5)?,
        key: section_string(sections, 6)?,
        genre: section_string(sections, 9)?,
        label: section_string(sections, 10)?,
        artwork_id,
    })
}

/// Extracts the filesystem path from the sections of a path response.
pub(crate) fn parse_track_path(sections: &[Bytes]) -> RemoteDbResult<String> {
    if sections.len() <= PATH_SECTION {
        return Err(ProtocolError::MissingSections.into());
    }
    section_string(sections, PATH_SECTION)
}
