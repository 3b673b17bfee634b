//! Pure wire codecs for the link protocol.
//!
//! Everything in this module is side-effect free: byte buffers in,
//! parsed values (or [`ProtocolError`]) out. The fixed byte blobs the
//! codecs consume live in [`crate::protocol_constants`].

pub mod announce;
pub mod framing;
pub mod strings;

use thiserror::Error;

/// Errors produced while parsing protocol data.
///
/// A single malformed packet is never fatal to the component that
/// received it; announce parse errors are dropped at the receive loop
/// and remote-DB parse errors poison only the session they came from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer does not start with the packet magic.
    #[error("packet magic mismatch")]
    BadMagic,

    /// Packet carries an unexpected kind byte.
    #[error("unexpected packet kind 0x{0:02x}")]
    WrongKind(u8),

    /// Buffer is shorter than the fixed layout requires.
    #[error("packet truncated: need {expected} bytes, have {actual}")]
    Truncated {
        /// Bytes the layout requires.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A framed response section is shorter than its fixed layout.
    #[error("response section too short: need {expected} bytes, have {actual}")]
    ShortSection {
        /// Bytes the layout requires.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A multi-section response buffer did not contain the framed
    /// preamble and final-section marker.
    #[error("response is missing framed sections")]
    MissingSections,
}

/// Convenient Result alias for codec operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
