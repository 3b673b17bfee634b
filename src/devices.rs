//! Live device set tracking.
//!
//! The [`DeviceManager`] ingests announce packets from the shared
//! UDP/50000 socket, maintains the id-keyed device set, and notifies
//! registered [`DeviceListener`]s about additions and removals. A
//! companion reaper task expires devices that have gone silent.
//!
//! Event ordering: both the ingest path and the reaper dispatch their
//! events while holding the device map lock, so listeners observe
//! changes in exactly the order they happened. Listener callbacks must
//! therefore not block and must not call back into the manager.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tokio_util::sync::CancellationToken;

use crate::device::Device;
use crate::events::{DeviceEvent, DeviceListener};
use crate::protocol::announce::parse_announce;

/// How often the reaper scans for silent devices.
const REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Silence after which a device is considered gone.
const DEVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// A device plus its liveness bookkeeping.
struct TrackedDevice {
    device: Device,
    last_seen: Instant,
}

impl TrackedDevice {
    fn new(device: Device) -> Self {
        Self {
            device,
            last_seen: Instant::now(),
        }
    }
}

/// Tracks every peer currently announcing on the network.
///
/// At most one device is registered per id. A device enters the set on
/// its first valid announce and leaves when it has been silent for 10
/// seconds, when another device claims its id with a different MAC, or
/// when the manager shuts down.
pub struct DeviceManager {
    devices: Mutex<HashMap<u8, TrackedDevice>>,
    listeners: Mutex<Vec<Arc<dyn DeviceListener>>>,
}

impl DeviceManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener for device set changes.
    ///
    /// Listeners are called in registration order.
    pub fn add_listener(&self, listener: Arc<dyn DeviceListener>) {
        self.listeners.lock().push(listener);
    }

    /// Snapshot of the current device set.
    pub fn devices(&self) -> Vec<Device> {
        self.devices
            .lock()
            .values()
            .map(|tracked| tracked.device.clone())
            .collect()
    }

    /// Looks up the device registered under `id`.
    pub fn device(&self, id: u8) -> Option<Device> {
        self.devices
            .lock()
            .get(&id)
            .map(|tracked| tracked.device.clone())
    }

    /// Feeds one parsed announce into the set.
    ///
    /// - unknown id: insert, emit added
    /// - known id, same MAC: refresh `last_seen`
    /// - known id, different MAC: the old instance is replaced, emitting
    ///   removed then added
    pub(crate) fn ingest(&self, device: Device) {
        let mut devices = self.devices.lock();
        let mut events = Vec::new();

        match devices.entry(device.id) {
            Entry::Occupied(mut entry) => {
                if entry.get().device.mac == device.mac {
                    entry.get_mut().last_seen = Instant::now();
                } else {
                    let old = entry.insert(TrackedDevice::new(device.clone()));
                    log::info!(
                        "[Devices] Id {} reclaimed: {} replaces {}",
                        device.id,
                        device,
                        old.device
                    );
                    events.push(DeviceEvent::Removed { device: old.device });
                    events.push(DeviceEvent::Added { device });
                }
            }
            Entry::Vacant(entry) => {
                log::info!("[Devices] Found {}", device);
                entry.insert(TrackedDevice::new(device.clone()));
                events.push(DeviceEvent::Added { device });
            }
        }

        self.dispatch(events);
    }

    /// Removes every device that has been silent longer than `timeout`.
    pub(crate) fn reap(&self, timeout: Duration) {
        let now = Instant::now();
        let mut devices = self.devices.lock();

        let expired: Vec<u8> = devices
            .iter()
            .filter(|(_, tracked)| now.duration_since(tracked.last_seen) > timeout)
            .map(|(id, _)| *id)
            .collect();

        let mut events = Vec::new();
        for id in expired {
            if let Some(tracked) = devices.remove(&id) {
                log::info!("[Devices] Lost {} (silent)", tracked.device);
                events.push(DeviceEvent::Removed {
                    device: tracked.device,
                });
            }
        }

        self.dispatch(events);
    }

    /// Empties the set, emitting removed for every resident device.
    pub(crate) fn shutdown(&self) {
        let mut devices = self.devices.lock();
        let events: Vec<DeviceEvent> = devices
            .drain()
            .map(|(_, tracked)| DeviceEvent::Removed {
                device: tracked.device,
            })
            .collect();
        self.dispatch(events);
    }

    /// Delivers `events` to every listener, in listener registration
    /// order per event.
    fn dispatch(&self, events: Vec<DeviceEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.lock();
        for event in &events {
            for listener in listeners.iter() {
                match event {
                    DeviceEvent::Added { device } => listener.on_added(device),
                    DeviceEvent::Removed { device } => listener.on_removed(device),
                }
            }
        }
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the announce receive loop on the shared UDP/50000 socket.
///
/// Malformed packets are dropped silently (the port also carries other
/// packet kinds), as are the virtual player's own broadcasts, which the
/// shared socket hears back.
pub(crate) fn spawn_receiver(
    manager: Arc<DeviceManager>,
    socket: Arc<UdpSocket>,
    own: Device,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok((len, src)) => match parse_announce(&buf[..len]) {
                        Ok(device) => {
                            if device.id == own.id && device.mac == own.mac {
                                continue;
                            }
                            manager.ingest(device);
                        }
                        Err(e) => {
                            log::trace!("[Devices] Dropping packet from {}: {}", src, e);
                        }
                    },
                    Err(e) => {
                        log::warn!("[Devices] Announce recv error: {}", e);
                    }
                },
            }
        }
        log::debug!("[Devices] Announce receiver stopped");
    })
}

/// Spawns the reaper that expires silent devices.
pub(crate) fn spawn_reaper(
    manager: Arc<DeviceManager>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(REAPER_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => manager.reap(DEVICE_TIMEOUT),
            }
        }
        log::debug!("[Devices] Reaper stopped");
    })
}
