//! Per-device remote database session.
//!
//! A session owns at most one TCP connection to its device's remote
//! database service. The connection is established (and re-established
//! after failures) by a background reconnect loop; queries from
//! embedder tasks serialize on the session's connection lock, so
//! message ids stay monotonic and responses unambiguous.

use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::device::Device;
use crate::protocol::framing::{final_section_marker, frame_message, split_sections};
use crate::protocol_constants::{
    RD_ACK_LEN, RD_ARTWORK_HEADER_LEN, RD_HELLO, RD_HELLO_REPLY_LEN, RD_IDENTIFY_MSG_ID,
    RD_IDENTIFY_PREAMBLE, RD_SEPARATOR,
};

use super::messages::{
    artwork_query, parse_track_metadata, parse_track_path, track_metadata_query, track_path_query,
    QueryParts,
};
use super::port::query_db_port;
use super::{RemoteDbError, RemoteDbResult, Track, TrackQuery};

/// Retry cadence of the reconnect loop.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// An established, handshaken connection.
///
/// While a `Connection` exists, the handshake has completed and
/// `msg_count` is the id the next query will use.
struct Connection {
    stream: TcpStream,
    msg_count: u32,
}

impl Connection {
    /// Runs both packets of a multi-message query under one message id
    /// and drains the response until it ends with the final-section
    /// marker.
    ///
    /// The suffix match runs against the whole accumulated buffer, and
    /// a read of zero bytes before the marker appears is an error, so
    /// a misbehaving peer can never wedge the reader.
    async fn multi_message_query(&mut self, parts: &QueryParts) -> RemoteDbResult<Vec<Bytes>> {
        let msg_id = self.msg_count;

        self.stream
            .write_all(&frame_message(msg_id, &parts.initial))
            .await?;
        let mut ack = [0u8; RD_ACK_LEN];
        self.stream.read_exact(&mut ack).await?;

        self.stream
            .write_all(&frame_message(msg_id, &parts.bulk))
            .await?;

        let marker = final_section_marker(msg_id);
        let mut response: Vec<u8> = Vec::with_capacity(4096);
        let mut chunk = [0u8; 4096];
        loop {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(RemoteDbError::UnexpectedEof);
            }
            response.extend_from_slice(&chunk[..n]);
            if response.ends_with(&marker) {
                break;
            }
        }

        self.msg_count += 1;
        Ok(split_sections(&response)?)
    }

    /// Runs the single-packet artwork query: a 52-byte header whose
    /// trailing 4 bytes give the JPEG length, then exactly that many
    /// bytes of image data.
    async fn artwork(&mut self, payload: &[u8]) -> RemoteDbResult<Bytes> {
        let msg_id = self.msg_count;

        self.stream
            .write_all(&frame_message(msg_id, payload))
            .await?;

        let mut header = [0u8; RD_ARTWORK_HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let len = u32::from_be_bytes([header[48], header[49], header[50], header[51]]) as usize;

        let mut data = vec![0u8; len];
        self.stream.read_exact(&mut data).await?;

        self.msg_count += 1;
        Ok(Bytes::from(data))
    }
}

/// Runs the metadata, path, and conditional artwork phases of one
/// track query on an established connection.
async fn execute_track_query(
    conn: &mut Connection,
    requester_id: u8,
    query: &TrackQuery,
) -> RemoteDbResult<Track> {
    let slot = query.slot.to_byte();

    let parts = track_metadata_query(requester_id, slot, query.track_id);
    let sections = conn.multi_message_query(&parts).await?;
    let meta = parse_track_metadata(&sections)?;

    let parts = track_path_query(requester_id, slot, query.track_id);
    let sections = conn.multi_message_query(&parts).await?;
    let path = parse_track_path(&sections)?;

    let artwork = if meta.artwork_id != 0 {
        let jpeg = conn
            .artwork(&artwork_query(requester_id, slot, meta.artwork_id))
            .await?;
        (!jpeg.is_empty()).then_some(jpeg)
    } else {
        None
    };

    Ok(Track {
        id: query.track_id,
        path,
        title: meta.title,
        artist: meta.artist,
        album: meta.album,
        label: meta.label,
        genre: meta.genre,
        comment: meta.comment,
        key: meta.key,
        length: Duration::from_secs(u64::from(meta.length_secs)),
        artwork,
    })
}

/// A long-lived link to one device's remote database.
pub(crate) struct Session {
    device: Device,
    requester_id: u8,
    query_addr: SocketAddrV4,
    conn: tokio::sync::Mutex<Option<Connection>>,
    linked: AtomicBool,
    reconnect_now: Notify,
    shutdown: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Creates a session for `device`; call [`Session::spawn`] to start
    /// the reconnect loop.
    pub(crate) fn new(
        device: Device,
        requester_id: u8,
        query_addr: SocketAddrV4,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            device,
            requester_id,
            query_addr,
            conn: tokio::sync::Mutex::new(None),
            linked: AtomicBool::new(false),
            reconnect_now: Notify::new(),
            shutdown,
            task: parking_lot::Mutex::new(None),
        })
    }

    /// Starts the reconnect loop. The first connection attempt happens
    /// immediately.
    pub(crate) fn spawn(self: &Arc<Self>) {
        let session = Arc::clone(self);
        *self.task.lock() = Some(tokio::spawn(session.run()));
    }

    /// Whether the connection is currently open and handshaken.
    pub(crate) fn is_linked(&self) -> bool {
        self.linked.load(Ordering::SeqCst)
    }

    /// Signals the reconnect loop to stop; the socket closes when the
    /// loop drops the connection.
    pub(crate) fn close(&self) {
        self.shutdown.cancel();
    }

    /// As [`Session::close`], but waits for the loop to finish.
    pub(crate) async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Runs one track query on this session's connection.
    ///
    /// Serialized against other callers by the connection lock. On a
    /// transport or parse failure the connection is dropped and the
    /// reconnect loop nudged before the error is returned, so the next
    /// query after recovery starts from a fresh handshake.
    pub(crate) async fn get_track(&self, query: &TrackQuery) -> RemoteDbResult<Track> {
        let mut guard = self.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(RemoteDbError::NotLinked(self.device.id));
        };

        let result = tokio::select! {
            result = execute_track_query(conn, self.requester_id, query) => result,
            // Closing the session must unblock an in-flight read.
            _ = self.shutdown.cancelled() => Err(RemoteDbError::SessionClosed),
        };

        if let Err(e) = &result {
            if e.poisons_session() || matches!(e, RemoteDbError::SessionClosed) {
                log::warn!(
                    "[RemoteDb] Session to {} poisoned: {} (reconnecting)",
                    self.device,
                    e
                );
                *guard = None;
                self.linked.store(false, Ordering::SeqCst);
                self.reconnect_now.notify_one();
            }
        }

        result
    }

    /// Discovers the service port, connects, and performs the
    /// hello/identification handshake.
    ///
    /// The identification blob claims the virtual player's id as the
    /// requester identity; peers reject ids outside 1..4 for media
    /// slots.
    async fn establish(&self) -> RemoteDbResult<Connection> {
        let port = query_db_port(self.query_addr).await?;
        let mut stream = TcpStream::connect(SocketAddrV4::new(self.device.ip, port)).await?;

        stream.write_all(&RD_HELLO).await?;
        let mut hello_reply = [0u8; RD_HELLO_REPLY_LEN];
        stream.read_exact(&mut hello_reply).await?;

        let mut identify =
            Vec::with_capacity(RD_SEPARATOR.len() + RD_IDENTIFY_MSG_ID.len() + RD_IDENTIFY_PREAMBLE.len() + 1);
        identify.extend_from_slice(&RD_SEPARATOR);
        identify.extend_from_slice(&RD_IDENTIFY_MSG_ID);
        identify.extend_from_slice(&RD_IDENTIFY_PREAMBLE);
        identify.push(self.requester_id);
        stream.write_all(&identify).await?;

        let mut identify_reply = [0u8; RD_ACK_LEN];
        stream.read_exact(&mut identify_reply).await?;

        // The handshake resets the request pipeline.
        Ok(Connection {
            stream,
            msg_count: 1,
        })
    }

    /// The reconnect loop: one attempt immediately, then one per tick
    /// or poison nudge, never more than one in flight.
    async fn run(self: Arc<Self>) {
        let mut ticker = interval(RECONNECT_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the interval's immediate first tick so the select
        // below waits a full period between attempts.
        ticker.tick().await;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if !self.is_linked() {
                match self.establish().await {
                    Ok(conn) => {
                        *self.conn.lock().await = Some(conn);
                        self.linked.store(true, Ordering::SeqCst);
                        log::info!("[RemoteDb] Linked to {}", self.device);
                    }
                    Err(e) => {
                        log::debug!(
                            "[RemoteDb] Connecting to {} failed: {} (retrying)",
                            self.device,
                            e
                        );
                    }
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.reconnect_now.notified() => {}
            }
        }

        *self.conn.lock().await = None;
        self.linked.store(false, Ordering::SeqCst);
        log::debug!("[RemoteDb] Session to {} stopped", self.device);
    }
}
