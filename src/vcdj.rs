//! The virtual player.
//!
//! Real players only answer remote database queries from peers they
//! have seen announcing themselves, so the library joins the network as
//! a synthetic player: a [`Device`] composed from the selected
//! interface, broadcast as an announce packet every 1.5 seconds on the
//! shared UDP/50000 socket.

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::device::{Device, DeviceType};
use crate::netif::AnnounceInterface;
use crate::protocol::announce::announce_packet;
use crate::protocol_constants::{ANNOUNCE_PORT, VIRTUAL_PLAYER_NAME};

/// Keepalive cadence real players expect from their peers.
const ANNOUNCE_INTERVAL: Duration = Duration::from_millis(1500);

/// Composes the synthetic device announced on behalf of the embedder.
pub(crate) fn virtual_device(interface: &AnnounceInterface, player_id: u8) -> Device {
    Device {
        name: VIRTUAL_PLAYER_NAME.to_string(),
        id: player_id,
        device_type: DeviceType::Player,
        mac: interface.mac,
        ip: interface.ip,
    }
}

/// Spawns the keepalive task broadcasting `device`'s announce packet to
/// `target` until cancelled.
///
/// Individual send failures are logged and do not stop the ticker; the
/// first announce goes out immediately.
pub(crate) fn spawn_announcer(
    socket: Arc<UdpSocket>,
    device: Device,
    target: SocketAddr,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let packet = announce_packet(&device);
    tokio::spawn(async move {
        let mut ticker = interval(ANNOUNCE_INTERVAL);
        log::debug!("[Vcdj] Announcing {} to {}", device, target);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = socket.send_to(&packet, target).await {
                        log::warn!("[Vcdj] Announce send to {} failed: {}", target, e);
                    }
                }
            }
        }
        log::debug!("[Vcdj] Announcer stopped");
    })
}

/// The broadcast target announce packets are sent to.
pub(crate) fn announce_target(interface: &AnnounceInterface) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(interface.broadcast, ANNOUNCE_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use crate::protocol::announce::parse_announce;

    fn test_interface() -> AnnounceInterface {
        AnnounceInterface {
            name: "eth0".to_string(),
            ip: Ipv4Addr::new(192, 168, 1, 42),
            mac: [0x02, 0x00, 0x00, 0xab, 0xcd, 0xef],
            broadcast: Ipv4Addr::new(192, 168, 1, 255),
        }
    }

    #[test]
    fn test_virtual_device_composition() {
        let device = virtual_device(&test_interface(), 4);
        assert_eq!(device.name, VIRTUAL_PLAYER_NAME);
        assert_eq!(device.id, 4);
        assert_eq!(device.device_type, DeviceType::Player);
        assert_eq!(device.mac, [0x02, 0x00, 0x00, 0xab, 0xcd, 0xef]);
        assert_eq!(device.ip, Ipv4Addr::new(192, 168, 1, 42));
    }

    #[test]
    fn test_announce_target_uses_broadcast() {
        let target = announce_target(&test_interface());
        assert_eq!(target.to_string(), "192.168.1.255:50000");
    }

    #[tokio::test]
    async fn test_announcer_broadcasts_parseable_packets() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sender = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let device = virtual_device(&test_interface(), 2);
        let cancel = CancellationToken::new();

        let handle = spawn_announcer(
            Arc::clone(&sender),
            device.clone(),
            receiver.local_addr().unwrap(),
            cancel.clone(),
        );

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
            .await
            .expect("first announce should be immediate")
            .unwrap();
        assert_eq!(parse_announce(&buf[..len]).unwrap(), device);

        cancel.cancel();
        handle.await.unwrap();
    }
}
