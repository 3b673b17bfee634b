//! Local interface selection and UDP socket setup for announcing.
//!
//! The virtual player binds to one broadcast-capable IPv4 interface and
//! advertises that interface's MAC and address in its announce packets.
//! Selection filters out loopback and virtual/container interfaces and
//! honors an explicitly requested interface name.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use local_ip_address::list_afinet_netifas;
use mac_address::mac_address_by_name;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;

/// Errors raised while selecting an interface or opening sockets.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No usable broadcast-capable interface was found.
    #[error("no usable network interface found")]
    NoInterfaces,

    /// The requested interface exists but has no usable IPv4 address.
    #[error("interface {0} has no usable IPv4 address")]
    NoIpv4(String),

    /// Failed to bind a UDP socket.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] io::Error),
}

/// Convenient Result alias for interface and socket operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Virtual interface prefixes to filter out when no interface name is
/// requested.
const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Checks if an interface name belongs to a virtual/container interface.
fn is_virtual_interface(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name_lower.starts_with(prefix))
}

/// The interface the virtual player announces from.
#[derive(Debug, Clone)]
pub struct AnnounceInterface {
    /// Interface name (e.g. "en0", "eth0").
    pub name: String,
    /// IPv4 address bound to this interface.
    pub ip: Ipv4Addr,
    /// Hardware address of this interface.
    pub mac: [u8; 6],
    /// Classful broadcast address announces are sent to.
    pub broadcast: Ipv4Addr,
}

/// Computes the classful broadcast address of `ip`: apply the default
/// class mask, then OR the host bits to one.
pub fn classful_broadcast(ip: Ipv4Addr) -> Ipv4Addr {
    let mask: u32 = match ip.octets()[0] {
        0..=127 => 0xff00_0000,   // class A /8
        128..=191 => 0xffff_0000, // class B /16
        _ => 0xffff_ff00,         // class C /24
    };
    Ipv4Addr::from(u32::from(ip) | !mask)
}

/// Picks the interface to announce from.
///
/// With a requested name, only that interface is considered. Otherwise
/// the first non-virtual interface that owns a non-loopback IPv4 and a
/// resolvable MAC wins.
pub fn select_interface(requested: Option<&str>) -> DiscoveryResult<AnnounceInterface> {
    let netifas = list_afinet_netifas().unwrap_or_else(|e| {
        log::warn!("[Netif] Failed to list network interfaces: {}", e);
        Vec::new()
    });

    let mut saw_requested = false;

    for (name, addr) in netifas {
        match requested {
            Some(wanted) => {
                if name != wanted {
                    continue;
                }
                saw_requested = true;
            }
            None => {
                if is_virtual_interface(&name) {
                    log::debug!("[Netif] Skipping virtual interface: {}", name);
                    continue;
                }
            }
        }

        let IpAddr::V4(ip) = addr else { continue };
        if ip.is_loopback() {
            continue;
        }

        let mac = match mac_address_by_name(&name) {
            Ok(Some(mac)) => mac.bytes(),
            _ => {
                log::debug!("[Netif] No MAC address for {}, skipping", name);
                continue;
            }
        };

        let broadcast = classful_broadcast(ip);
        log::debug!(
            "[Netif] Announcing from {} ({}, broadcast {})",
            name,
            ip,
            broadcast
        );
        return Ok(AnnounceInterface {
            name,
            ip,
            mac,
            broadcast,
        });
    }

    if let Some(wanted) = requested {
        if saw_requested {
            return Err(DiscoveryError::NoIpv4(wanted.to_string()));
        }
    }
    Err(DiscoveryError::NoInterfaces)
}

/// Creates a UDP socket bound to `0.0.0.0:<port>`.
///
/// Sets up the socket the way the announce and status listeners need:
/// - SO_REUSEADDR for rapid restarts
/// - SO_REUSEPORT on Unix
/// - SO_BROADCAST when the socket also sends announces
pub fn bind_udp(port: u16, enable_broadcast: bool) -> DiscoveryResult<UdpSocket> {
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Netif] Failed to set SO_REUSEADDR on :{}: {}", port, e);
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("[Netif] Failed to set SO_REUSEPORT on :{}: {}", port, e);
    }

    if enable_broadcast {
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("[Netif] Failed to set SO_BROADCAST on :{}: {}", port, e);
        }
    }

    // Set non-blocking before converting to a tokio socket.
    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;

    socket
        .bind(&bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classful_broadcast_class_a() {
        assert_eq!(
            classful_broadcast(Ipv4Addr::new(10, 1, 2, 3)),
            Ipv4Addr::new(10, 255, 255, 255)
        );
    }

    #[test]
    fn test_classful_broadcast_class_b() {
        assert_eq!(
            classful_broadcast(Ipv4Addr::new(172, 16, 4, 5)),
            Ipv4Addr::new(172, 16, 255, 255)
        );
    }

    #[test]
    fn test_classful_broadcast_class_c() {
        assert_eq!(
            classful_broadcast(Ipv4Addr::new(192, 168, 1, 20)),
            Ipv4Addr::new(192, 168, 1, 255)
        );
    }

    #[test]
    fn test_is_virtual_interface() {
        assert!(is_virtual_interface("lo"));
        assert!(is_virtual_interface("docker0"));
        assert!(is_virtual_interface("veth1234"));
        assert!(is_virtual_interface("br-abc"));
        assert!(!is_virtual_interface("eth0"));
        assert!(!is_virtual_interface("en0"));
        assert!(!is_virtual_interface("wlan0"));
    }

    #[test]
    fn test_select_unknown_interface() {
        let err = select_interface(Some("surely-not-a-real-interface")).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoInterfaces));
    }
}
