//! Library configuration.

use serde::{Deserialize, Serialize};

/// Configuration for joining the link network.
///
/// All fields have sensible defaults; `Config::default()` joins via the
/// first usable interface as player 5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interface to announce from. `None` picks the first
    /// broadcast-capable interface with a usable IPv4 address.
    #[serde(default)]
    pub interface_name: Option<String>,

    /// Player number the virtual player claims.
    ///
    /// Real players only honour media-slot (SD/USB) metadata queries
    /// from requester ids 1-4; an id outside that range still joins the
    /// network and can query rekordbox collections, but the embedder
    /// must pick a non-colliding id in 1..4 for full functionality.
    #[serde(default = "default_virtual_player_id")]
    pub virtual_player_id: u8,

    /// Leave UDP/50002 unbound so an external capture-based status
    /// monitor can coexist with another process that owns the port.
    #[serde(default)]
    pub enable_sniff_mode: bool,
}

fn default_virtual_player_id() -> u8 {
    // Off the 1-4 range real players use, so a default-configured
    // client never collides with hardware.
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface_name: None,
            virtual_player_id: default_virtual_player_id(),
            enable_sniff_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interface_name, None);
        assert_eq!(config.virtual_player_id, 5);
        assert!(!config.enable_sniff_mode);
    }
}
