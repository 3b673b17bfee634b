//! Listener abstraction for device set changes.
//!
//! Components depend on the [`DeviceListener`] trait rather than on the
//! device manager's internals, enabling testing and alternative
//! consumers (the remote-DB coordinator is one such listener).

use crate::device::Device;

/// Trait for reacting to devices joining and leaving the network.
///
/// # Contract
///
/// Callbacks run synchronously on the device manager's event task, in
/// listener registration order, and must not block. They must not call
/// back into the manager (no reentrancy guarantee). A listener sees
/// `on_removed` exactly once for every device instance it was
/// previously handed via `on_added`.
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// impl DeviceListener for Printer {
///     fn on_added(&self, device: &Device) {
///         println!("+ {device}");
///     }
///
///     fn on_removed(&self, device: &Device) {
///         println!("- {device}");
///     }
/// }
/// ```
pub trait DeviceListener: Send + Sync {
    /// A device entered the set.
    fn on_added(&self, device: &Device);

    /// A device left the set.
    fn on_removed(&self, device: &Device);
}

/// No-op listener for embedders that only use the polling API.
pub struct NoopDeviceListener;

impl DeviceListener for NoopDeviceListener {
    fn on_added(&self, _device: &Device) {
        // No-op
    }

    fn on_removed(&self, _device: &Device) {
        // No-op
    }
}

/// Logging listener for debugging and development.
///
/// Logs all device set changes at debug level.
pub struct LoggingDeviceListener;

impl DeviceListener for LoggingDeviceListener {
    fn on_added(&self, device: &Device) {
        tracing::debug!(%device, "device_added");
    }

    fn on_removed(&self, device: &Device) {
        tracing::debug!(%device, "device_removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::device::DeviceType;

    /// Test listener that counts callbacks.
    pub(crate) struct CountingListener {
        added: AtomicUsize,
        removed: AtomicUsize,
    }

    impl CountingListener {
        fn new() -> Self {
            Self {
                added: AtomicUsize::new(0),
                removed: AtomicUsize::new(0),
            }
        }
    }

    impl DeviceListener for CountingListener {
        fn on_added(&self, _device: &Device) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn on_removed(&self, _device: &Device) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_listener_tracks_events() {
        let listener = Arc::new(CountingListener::new());
        let device = Device {
            name: "XDJ-1000".to_string(),
            id: 1,
            device_type: DeviceType::Player,
            mac: [0; 6],
            ip: Ipv4Addr::new(192, 168, 1, 10),
        };

        listener.on_added(&device);
        listener.on_added(&device);
        listener.on_removed(&device);

        assert_eq!(listener.added.load(Ordering::SeqCst), 2);
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);
    }
}
