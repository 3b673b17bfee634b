//! Remote database access.
//!
//! Every metadata-capable device runs a TCP "remote database" service
//! on a dynamically assigned port. This module keeps one session per
//! eligible device alive and answers track metadata queries by routing
//! them to the right session:
//!
//! - `port`: discovers the service port via TCP/12523
//! - `session`: per-device connection, handshake, request pipeline,
//!   reconnect loop
//! - `messages`: query payloads and positional response extraction
//! - [`RemoteDb`]: the coordinator wired to the device manager

mod messages;
mod port;
mod session;
#[cfg(test)]
pub(crate) mod test_support;

use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::device::Device;
use crate::events::DeviceListener;
use crate::protocol::ProtocolError;
use crate::protocol_constants::DB_SERVER_QUERY_PORT;

use session::Session;

/// Where a track lives on its owning device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackSlot {
    /// The optical disc drive. Not supported for metadata queries.
    Cd,
    /// An SD card.
    Sd,
    /// A USB drive.
    Usb,
    /// The rekordbox collection of a software instance.
    Rekordbox,
}

impl TrackSlot {
    /// Returns the wire representation used in query payloads.
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Self::Cd => 0x01,
            Self::Sd => 0x02,
            Self::Usb => 0x03,
            Self::Rekordbox => 0x04,
        }
    }
}

impl std::fmt::Display for TrackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cd => write!(f, "cd"),
            Self::Sd => write!(f, "sd"),
            Self::Usb => write!(f, "usb"),
            Self::Rekordbox => write!(f, "rekordbox"),
        }
    }
}

/// Identifies one track on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackQuery {
    /// Id of the device that owns the track.
    pub device_id: u8,
    /// Slot the track is loaded from.
    pub slot: TrackSlot,
    /// rekordbox id of the track.
    pub track_id: u32,
}

/// The result of a successful metadata query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// rekordbox id of the track.
    pub id: u32,
    /// Filesystem path on the owning device.
    pub path: String,
    /// Track title.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Album name.
    pub album: String,
    /// Record label.
    pub label: String,
    /// Genre.
    pub genre: String,
    /// Free-form comment.
    pub comment: String,
    /// Musical key, as stored in rekordbox (e.g. "Am").
    pub key: String,
    /// Track length.
    pub length: Duration,
    /// Artwork JPEG, when the track has one.
    pub artwork: Option<Bytes>,
}

/// Errors raised while talking to a remote database.
#[derive(Debug, Error)]
pub enum RemoteDbError {
    /// The queried device has no open remote database session.
    #[error("device {0} is not linked")]
    NotLinked(u8),

    /// The slot cannot be queried (optical disc, or a media slot the
    /// peer will not serve to this requester id).
    #[error("slot {0} is not supported for metadata queries")]
    Unsupported(TrackSlot),

    /// A socket operation failed.
    #[error("remote database transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection before the response completed.
    #[error("connection closed before the final response section")]
    UnexpectedEof,

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(#[from] ProtocolError),

    /// The session was closed while the query was in flight.
    #[error("session closed")]
    SessionClosed,
}

impl RemoteDbError {
    /// Whether the connection state is unknown after this error, so
    /// the session must be torn down and re-established.
    pub(crate) fn poisons_session(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::UnexpectedEof | Self::Malformed(_)
        )
    }
}

/// Convenient Result alias for remote database operations.
pub type RemoteDbResult<T> = Result<T, RemoteDbError>;

/// Routes metadata queries to per-device sessions.
///
/// Registered as a [`DeviceListener`] on the device manager: players
/// and rekordbox instances get a session the moment they are added and
/// lose it the moment they are removed. Mixers and unknown device
/// types are ignored.
pub struct RemoteDb {
    /// The virtual player's id, claimed as requester identity in every
    /// session handshake.
    requester_id: u8,
    /// TCP port of the port-discovery service on each device.
    db_query_port: u16,
    sessions: DashMap<u8, Arc<Session>>,
    cancel: CancellationToken,
}

impl RemoteDb {
    /// Creates a coordinator whose sessions are children of `cancel`.
    pub(crate) fn new(requester_id: u8, cancel: CancellationToken) -> Self {
        Self::with_query_port(requester_id, cancel, DB_SERVER_QUERY_PORT)
    }

    /// As [`RemoteDb::new`] with a non-standard port-discovery port.
    pub(crate) fn with_query_port(
        requester_id: u8,
        cancel: CancellationToken,
        db_query_port: u16,
    ) -> Self {
        Self {
            requester_id,
            db_query_port,
            sessions: DashMap::new(),
            cancel,
        }
    }

    /// True iff `device_id` has a session whose connection is open.
    pub fn is_linked(&self, device_id: u8) -> bool {
        self.sessions
            .get(&device_id)
            .map(|session| session.is_linked())
            .unwrap_or(false)
    }

    /// Runs the metadata, path, and (when the track has artwork)
    /// artwork queries for `query` against the owning device.
    ///
    /// Queries on one session are serialized; concurrent callers block
    /// on the session lock. A transport failure tears the connection
    /// down and nudges the reconnect loop before the error is returned.
    pub async fn get_track(&self, query: &TrackQuery) -> RemoteDbResult<Track> {
        let session = self
            .sessions
            .get(&query.device_id)
            .map(|entry| Arc::clone(entry.value()));
        let Some(session) = session else {
            return Err(RemoteDbError::NotLinked(query.device_id));
        };
        if !session.is_linked() {
            return Err(RemoteDbError::NotLinked(query.device_id));
        }

        if query.slot == TrackSlot::Cd {
            return Err(RemoteDbError::Unsupported(query.slot));
        }
        // Players only honour media-slot queries from requester ids a
        // real player could hold.
        if !(1..=4).contains(&self.requester_id)
            && matches!(query.slot, TrackSlot::Sd | TrackSlot::Usb)
        {
            log::warn!(
                "[RemoteDb] Rejecting {} query: virtual id {} is outside 1..4",
                query.slot,
                self.requester_id
            );
            return Err(RemoteDbError::Unsupported(query.slot));
        }

        session.get_track(query).await
    }

    /// Shuts every session down and waits for their tasks to finish.
    pub(crate) async fn close(&self) {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.sessions.clear();
        futures::future::join_all(sessions.iter().map(|session| session.shutdown())).await;
    }

    fn open_session(&self, device: &Device) {
        let query_addr = SocketAddrV4::new(device.ip, self.db_query_port);
        let session = Session::new(
            device.clone(),
            self.requester_id,
            query_addr,
            self.cancel.child_token(),
        );
        session.spawn();
        if let Some(old) = self.sessions.insert(device.id, session) {
            // An id can only be re-added after a removal, but a stale
            // entry must never keep its reconnect loop.
            old.close();
        }
    }
}

impl DeviceListener for RemoteDb {
    fn on_added(&self, device: &Device) {
        if !device.device_type.has_remote_db() {
            log::debug!("[RemoteDb] Ignoring {} (no remote database)", device);
            return;
        }
        log::info!("[RemoteDb] Opening session for {}", device);
        self.open_session(device);
    }

    fn on_removed(&self, device: &Device) {
        if let Some((_, session)) = self.sessions.remove(&device.id) {
            log::info!("[RemoteDb] Closing session for {}", device);
            session.close();
        }
    }
}
