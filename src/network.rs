//! The network facade.
//!
//! [`Network::connect`] wires the whole client together: it selects the
//! announce interface, composes the virtual player, binds the shared
//! UDP sockets, starts the announce/receive/reaper tasks, and registers
//! the remote database coordinator on the device manager. The returned
//! handle owns every task and socket; [`Network::close`] tears them
//! down.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::device::Device;
use crate::devices::{self, DeviceManager};
use crate::error::DjLinkResult;
use crate::events::DeviceListener;
use crate::netif;
use crate::protocol_constants::{ANNOUNCE_PORT, STATUS_PORT};
use crate::remotedb::{RemoteDb, RemoteDbResult, Track, TrackQuery};
use crate::status::{self, NoopStatusSink, StatusSink};
use crate::vcdj;

/// Connects to the link network with `config` and a no-op status sink.
///
/// Convenience wrapper around [`Network::connect`].
pub async fn connect(config: Config) -> DjLinkResult<Network> {
    Network::connect(config).await
}

/// An active link network client.
///
/// Owns the announce and status sockets and all background tasks;
/// dropping the handle without calling [`Network::close`] leaves the
/// tasks running until the process exits. Running two concurrent
/// clients in one host is undefined: both would bind UDP/50000 with
/// the reuse flags set, and which one receives announces is up to the
/// OS.
pub struct Network {
    virtual_device: Device,
    manager: Arc<DeviceManager>,
    remotedb: Arc<RemoteDb>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network").finish_non_exhaustive()
    }
}

impl Network {
    /// Connects with a no-op status sink.
    pub async fn connect(config: Config) -> DjLinkResult<Self> {
        Self::connect_with_sink(config, Arc::new(NoopStatusSink)).await
    }

    /// Connects, forwarding raw status datagrams to `status_sink`.
    ///
    /// Configuration problems (no usable interface, no IPv4 on the
    /// requested interface, socket bind failures) abort the connect and
    /// are returned to the caller.
    pub async fn connect_with_sink(
        config: Config,
        status_sink: Arc<dyn StatusSink>,
    ) -> DjLinkResult<Self> {
        let interface = netif::select_interface(config.interface_name.as_deref())?;

        if !(1..=4).contains(&config.virtual_player_id) {
            // The library does not arbitrate id collisions either way;
            // this is the one observable diagnostic.
            log::warn!(
                "[Network] Virtual player id {} is outside 1..4; media-slot metadata queries are disabled",
                config.virtual_player_id
            );
        }

        let virtual_device = vcdj::virtual_device(&interface, config.virtual_player_id);
        let announce_socket = Arc::new(netif::bind_udp(ANNOUNCE_PORT, true)?);

        let cancel = CancellationToken::new();
        let manager = Arc::new(DeviceManager::new());
        let remotedb = Arc::new(RemoteDb::new(
            config.virtual_player_id,
            cancel.child_token(),
        ));
        manager.add_listener(Arc::clone(&remotedb) as Arc<dyn DeviceListener>);

        let mut tasks = vec![
            vcdj::spawn_announcer(
                Arc::clone(&announce_socket),
                virtual_device.clone(),
                vcdj::announce_target(&interface),
                cancel.child_token(),
            ),
            devices::spawn_receiver(
                Arc::clone(&manager),
                announce_socket,
                virtual_device.clone(),
                cancel.child_token(),
            ),
            devices::spawn_reaper(Arc::clone(&manager), cancel.child_token()),
        ];

        if config.enable_sniff_mode {
            log::info!("[Network] Sniff mode: leaving UDP/{} unbound", STATUS_PORT);
        } else {
            let status_socket = netif::bind_udp(STATUS_PORT, false)?;
            tasks.push(status::spawn_status_listener(
                status_socket,
                status_sink,
                cancel.child_token(),
            ));
        }

        log::info!(
            "[Network] Connected as {} via {}",
            virtual_device,
            interface.name
        );

        Ok(Self {
            virtual_device,
            manager,
            remotedb,
            cancel,
            tasks: Mutex::new(tasks),
        })
    }

    /// The synthetic device announced on the embedder's behalf.
    pub fn virtual_device(&self) -> &Device {
        &self.virtual_device
    }

    /// The live device set.
    pub fn device_manager(&self) -> &Arc<DeviceManager> {
        &self.manager
    }

    /// The remote database coordinator.
    pub fn remote_db(&self) -> &Arc<RemoteDb> {
        &self.remotedb
    }

    /// True iff `device_id` currently has an open metadata session.
    pub fn is_linked(&self, device_id: u8) -> bool {
        self.remotedb.is_linked(device_id)
    }

    /// Queries track metadata from the device that owns the track.
    pub async fn get_track(&self, query: &TrackQuery) -> RemoteDbResult<Track> {
        self.remotedb.get_track(query).await
    }

    /// Stops all tasks, closes every session and socket, and empties
    /// the device set (listeners see a removal for each device).
    pub async fn close(&self) {
        self.cancel.cancel();
        self.remotedb.close().await;
        self.manager.shutdown();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        futures::future::join_all(tasks).await;
        log::info!("[Network] Closed");
    }
}
