//! Remote database port discovery.
//!
//! Every metadata-capable device runs a fixed TCP service whose sole
//! job is to reveal the dynamically assigned port of the remote
//! database: one query, a 2-byte big-endian port number back, and the
//! connection is closed.

use std::net::SocketAddrV4;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol_constants::RD_PORT_QUERY;

use super::RemoteDbResult;

/// Asks the device at `query_addr` for its remote database port.
pub(crate) async fn query_db_port(query_addr: SocketAddrV4) -> RemoteDbResult<u16> {
    let mut stream = TcpStream::connect(query_addr).await?;
    stream.write_all(&RD_PORT_QUERY).await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;
    Ok(u16::from_be_bytes(reply))
}
