//! In-process remote database peer used by session and coordinator
//! tests.
//!
//! Serves the real wire protocol on loopback: a port-discovery
//! listener plus a database listener that performs the handshake and
//! answers metadata, path, and artwork queries with canned values
//! derived from the requested track id.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::framing::{final_section_marker, frame_message};
use crate::protocol::strings::encode_utf16_be;
use crate::protocol_constants::{RD_PORT_QUERY, RD_SECTION_STRING_OFFSET};

/// Canned title for a track id.
pub(crate) fn title_for(track_id: u32) -> String {
    format!("Track {}", track_id)
}

/// Canned filesystem path for a track id.
pub(crate) fn path_for(track_id: u32) -> String {
    format!("/Contents/UnlockedFiles/lmst_{}.mp3", track_id)
}

/// Tunable behavior of the mock peer.
pub(crate) struct MockDbConfig {
    /// Artwork id reported in every metadata response (0 = none).
    pub artwork_id: u32,
    /// JPEG bytes served for artwork queries.
    pub artwork: Vec<u8>,
    /// Hang up once, right after reading the first packet of the first
    /// multi-message query.
    pub drop_first_query: bool,
}

impl Default for MockDbConfig {
    fn default() -> Self {
        Self {
            artwork_id: 0,
            artwork: vec![0xff, 0xd8, 0xff, 0xe0],
            drop_first_query: false,
        }
    }
}

struct MockState {
    config: MockDbConfig,
    queries_served: AtomicUsize,
    artwork_requests: AtomicUsize,
    msg_ids: Mutex<Vec<u32>>,
    dropped_once: AtomicBool,
}

/// Handle to a running mock peer.
pub(crate) struct MockDb {
    query_addr: SocketAddrV4,
    state: Arc<MockState>,
}

impl MockDb {
    pub(crate) async fn spawn() -> Self {
        Self::spawn_with(MockDbConfig::default()).await
    }

    pub(crate) async fn spawn_with(config: MockDbConfig) -> Self {
        let db_listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let db_port = db_listener.local_addr().unwrap().port();

        let query_listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let SocketAddr::V4(query_addr) = query_listener.local_addr().unwrap() else {
            unreachable!()
        };

        let state = Arc::new(MockState {
            config,
            queries_served: AtomicUsize::new(0),
            artwork_requests: AtomicUsize::new(0),
            msg_ids: Mutex::new(Vec::new()),
            dropped_once: AtomicBool::new(false),
        });

        // Port discovery: one round-trip per connection.
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = query_listener.accept().await {
                tokio::spawn(async move {
                    let mut query = [0u8; RD_PORT_QUERY.len()];
                    if stream.read_exact(&mut query).await.is_ok() {
                        let _ = stream.write_all(&db_port.to_be_bytes()).await;
                    }
                });
            }
        });

        // Remote database service: one handler task per connection.
        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = db_listener.accept().await {
                tokio::spawn(serve_connection(stream, Arc::clone(&accept_state)));
            }
        });

        Self { query_addr, state }
    }

    /// Address of the port-discovery listener.
    pub(crate) fn query_addr(&self) -> SocketAddrV4 {
        self.query_addr
    }

    /// Port of the port-discovery listener (devices on loopback).
    pub(crate) fn query_port(&self) -> u16 {
        self.query_addr.port()
    }

    /// Multi-message queries answered so far.
    pub(crate) fn queries_served(&self) -> usize {
        self.state.queries_served.load(Ordering::SeqCst)
    }

    /// Artwork queries answered so far.
    pub(crate) fn artwork_requests(&self) -> usize {
        self.state.artwork_requests.load(Ordering::SeqCst)
    }

    /// Message ids observed on query packets, in arrival order.
    pub(crate) fn msg_ids(&self) -> Vec<u32> {
        self.state.msg_ids.lock().clone()
    }

    /// Canned title (mirrors what the mock serves).
    pub(crate) fn title_for(&self, track_id: u32) -> String {
        title_for(track_id)
    }
}

async fn serve_connection(mut stream: TcpStream, state: Arc<MockState>) {
    // Handshake: hello (5 bytes each way), identification (37 bytes in,
    // 42 bytes out).
    let mut hello = [0u8; 5];
    if stream.read_exact(&mut hello).await.is_err() {
        return;
    }
    if stream.write_all(&[0u8; 5]).await.is_err() {
        return;
    }
    let mut identify = [0u8; 37];
    if stream.read_exact(&mut identify).await.is_err() {
        return;
    }
    if stream.write_all(&[0u8; 42]).await.is_err() {
        return;
    }

    // Every query's first packet is 43 bytes: 10 framing bytes plus the
    // 33-byte payload. The opcode at payload[1..3] selects the shape.
    loop {
        let mut first = [0u8; 43];
        if stream.read_exact(&mut first).await.is_err() {
            return;
        }
        let msg_id = u32::from_be_bytes([first[6], first[7], first[8], first[9]]);
        state.msg_ids.lock().push(msg_id);
        let opcode = [first[11], first[12]];
        let item_id = u32::from_be_bytes([first[39], first[40], first[41], first[42]]);

        if opcode == [0x20, 0x03] {
            state.artwork_requests.fetch_add(1, Ordering::SeqCst);
            let mut response = vec![0u8; 48];
            response.extend_from_slice(&(state.config.artwork.len() as u32).to_be_bytes());
            response.extend_from_slice(&state.config.artwork);
            if stream.write_all(&response).await.is_err() {
                return;
            }
            continue;
        }

        if state.config.drop_first_query && !state.dropped_once.swap(true, Ordering::SeqCst) {
            return;
        }

        // Acknowledge the first packet, read the bulk packet, answer.
        if stream.write_all(&[0u8; 42]).await.is_err() {
            return;
        }
        let mut bulk = [0u8; 53];
        if stream.read_exact(&mut bulk).await.is_err() {
            return;
        }

        let response = match opcode {
            [0x20, 0x02] => metadata_response(msg_id, item_id, state.config.artwork_id),
            [0x21, 0x02] => path_response(msg_id, item_id),
            _ => return,
        };
        if stream.write_all(&response).await.is_err() {
            return;
        }
        state.queries_served.fetch_add(1, Ordering::SeqCst);
    }
}

/// A section whose string field sits at the fixed in-section offset.
fn string_section(s: &str, trailing: &[u8]) -> Vec<u8> {
    let mut section = vec![0u8; RD_SECTION_STRING_OFFSET];
    section.extend_from_slice(&encode_utf16_be(s));
    section.extend_from_slice(trailing);
    section
}

fn frame_response(msg_id: u32, sections: Vec<Vec<u8>>) -> Vec<u8> {
    // Preamble section, the data sections, then the final marker.
    let mut buf = frame_message(msg_id, &[0x10, 0x40, 0x00, 0x0f]);
    for section in sections {
        buf.extend_from_slice(&frame_message(msg_id, &section));
    }
    buf.extend_from_slice(&final_section_marker(msg_id));
    buf
}

fn metadata_response(msg_id: u32, track_id: u32, artwork_id: u32) -> Vec<u8> {
    let mut title_trailing = vec![0u8; 15];
    title_trailing.extend_from_slice(&artwork_id.to_be_bytes());

    let mut length = vec![0u8; 28];
    length.extend_from_slice(&387u32.to_be_bytes());

    frame_response(
        msg_id,
        vec![
            string_section(&title_for(track_id), &title_trailing),
            string_section("Josh & Wesh", &[]),
            string_section("Singles Club", &[]),
            length,
            vec![0u8; 8],
            string_section("Tracks by www.example.com", &[]),
            string_section("Am", &[]),
            vec![0u8; 8],
            vec![0u8; 8],
            string_section("Trance", &[]),
            string_section("Loopmasters", &[]),
        ],
    )
}

fn path_response(msg_id: u32, track_id: u32) -> Vec<u8> {
    frame_response(
        msg_id,
        vec![
            vec![0u8; 8],
            vec![0u8; 8],
            vec![0u8; 8],
            vec![0u8; 8],
            string_section(&path_for(track_id), &[]),
        ],
    )
}
