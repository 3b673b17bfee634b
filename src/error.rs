//! Centralized error types for the library.
//!
//! Each domain module defines its own error enum; this module provides
//! the crate-wide [`DjLinkError`] that the facade surfaces, with
//! conversions from every domain error.

use thiserror::Error;

use crate::netif::DiscoveryError;
use crate::protocol::ProtocolError;
use crate::remotedb::RemoteDbError;

// Re-export Result type aliases from their defining modules
pub use crate::netif::DiscoveryResult;
pub use crate::protocol::ProtocolResult;
pub use crate::remotedb::RemoteDbResult;

/// Crate-wide error type surfaced by the network facade.
#[derive(Debug, Error)]
pub enum DjLinkError {
    /// Interface selection or socket setup failed.
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A packet or response could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A remote database operation failed.
    #[error("remote database error: {0}")]
    RemoteDb(#[from] RemoteDbError),
}

/// Convenient Result alias for crate-wide operations.
pub type DjLinkResult<T> = Result<T, DjLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_preserve_kind() {
        let err: DjLinkError = DiscoveryError::NoInterfaces.into();
        assert!(matches!(err, DjLinkError::Discovery(_)));

        let err: DjLinkError = ProtocolError::BadMagic.into();
        assert!(matches!(err, DjLinkError::Protocol(_)));

        let err: DjLinkError = RemoteDbError::NotLinked(2).into();
        assert!(matches!(err, DjLinkError::RemoteDb(_)));
    }
}
