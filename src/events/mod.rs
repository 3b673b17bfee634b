//! Device lifecycle events and the listener capability interface.
//!
//! This module provides:
//! - [`DeviceEvent`] describing what happened to the device set
//! - [`DeviceListener`] trait for components that react to it
//!
//! Listeners are invoked synchronously from the device manager in
//! registration order; see [`DeviceListener`] for the contract.

mod listener;

pub use listener::{DeviceListener, LoggingDeviceListener, NoopDeviceListener};

use serde::Serialize;

use crate::device::Device;

/// A change to the live device set.
///
/// Every event carries the exact device instance it concerns: a
/// `Removed` always refers to an instance previously delivered by an
/// `Added`, even when an id is reused by different hardware.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeviceEvent {
    /// A device entered the set.
    Added {
        /// The device that appeared.
        device: Device,
    },
    /// A device left the set (silence timeout, MAC change, or shutdown).
    Removed {
        /// The device that disappeared.
        device: Device,
    },
}

impl DeviceEvent {
    /// The device this event concerns.
    pub fn device(&self) -> &Device {
        match self {
            Self::Added { device } | Self::Removed { device } => device,
        }
    }
}
