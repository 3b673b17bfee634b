//! djlink-core - client library for the Pro DJ Link network protocol.
//!
//! This crate joins a LAN of professional DJ equipment as a pseudo
//! player (the "virtual player"), so that the real players accept it as
//! a peer, and exposes three capabilities to its embedder:
//!
//! - **Device presence**: every peer announcing itself on UDP/50000 is
//!   tracked in a live device set with add/remove notifications.
//! - **Status ingress**: raw per-player status packets from UDP/50002
//!   are forwarded to an embedder-supplied sink.
//! - **Metadata lookup**: track metadata, filesystem path, and artwork
//!   are fetched from each device's TCP remote database service.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`protocol`]: pure wire codecs (announce packet, remote-DB
//!   framing, UTF-16 strings)
//! - [`protocol_constants`]: every fixed byte blob and port in one
//!   auditable place
//! - [`devices`]: the live device set and its reaper
//! - [`events`]: device lifecycle events and the listener trait
//! - [`remotedb`]: per-device metadata sessions and their coordinator
//! - [`status`]: opaque status packet ingress
//! - [`network`]: the facade that wires everything together
//!
//! # Example
//!
//! ```ignore
//! use djlink_core::{connect, Config, TrackQuery, TrackSlot};
//!
//! let network = connect(Config::default()).await?;
//! // ... devices announce themselves ...
//! if network.is_linked(2) {
//!     let track = network
//!         .get_track(&TrackQuery { device_id: 2, slot: TrackSlot::Usb, track_id: 42 })
//!         .await?;
//!     println!("{} - {}", track.artist, track.title);
//! }
//! network.close().await;
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod device;
pub mod devices;
pub mod error;
pub mod events;
pub mod netif;
pub mod network;
pub mod protocol;
pub mod protocol_constants;
pub mod remotedb;
pub mod status;
mod vcdj;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use device::{Device, DeviceType};
pub use devices::DeviceManager;
pub use error::{DjLinkError, DjLinkResult};
pub use events::{DeviceEvent, DeviceListener, LoggingDeviceListener, NoopDeviceListener};
pub use netif::{DiscoveryError, DiscoveryResult};
pub use network::{connect, Network};
pub use protocol::{ProtocolError, ProtocolResult};
pub use remotedb::{RemoteDb, RemoteDbError, RemoteDbResult, Track, TrackQuery, TrackSlot};
pub use status::{NoopStatusSink, StatusSink};
