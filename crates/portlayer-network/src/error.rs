//! Error types for the port layer network subsystem
//!
//! Every failure is returned to the immediate caller. Nothing in this crate
//! retries or swallows an error; retry policy belongs to whoever drives the
//! [`NetworkApi`](crate::ports::inbound::NetworkApi).

use crate::domain::{ContainerId, ScopeId};
use crate::ports::outbound::TransportError;
use std::fmt;
use thiserror::Error;

/// Kind of resource named by a lookup failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Container,
    Scope,
    Endpoint,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Container => "container",
            ResourceKind::Scope => "scope",
            ResourceKind::Endpoint => "endpoint",
        };
        f.write_str(name)
    }
}

/// Network subsystem errors
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No such container, scope, or endpoint-for-scope
    #[error("{kind} not found: {id}")]
    ResourceNotFound { kind: ResourceKind, id: String },

    /// Resource with the same identity is already registered
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: ResourceKind, id: String },

    /// Bind on a bound endpoint, unbind on an unbound one, or teardown of
    /// something still bound
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Endpoint asked to bind/unbind on a scope it does not belong to
    #[error("endpoint belongs to scope {expected}, not {actual}")]
    ScopeMismatch { expected: ScopeId, actual: ScopeId },

    /// PCI slot already held by another endpoint of the container
    #[error("PCI slot {slot} already in use")]
    SlotInUse { slot: i32 },

    /// PCI slot outside the configured range
    #[error("PCI slot {slot} out of range 0..={max}")]
    InvalidSlot { slot: i32, max: i32 },

    /// Container already holds the configured maximum of endpoints
    #[error("container {container} reached endpoint limit of {limit}")]
    EndpointLimit { container: ContainerId, limit: usize },

    /// Attach/detach failure surfaced from the transport, unchanged
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl NetworkError {
    pub(crate) fn not_found(kind: ResourceKind, id: impl ToString) -> Self {
        NetworkError::ResourceNotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(kind: ResourceKind, id: impl ToString) -> Self {
        NetworkError::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }

    /// True for [`NetworkError::ResourceNotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, NetworkError::ResourceNotFound { .. })
    }

    /// True for [`NetworkError::InvalidState`]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, NetworkError::InvalidState(_))
    }
}

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_kind() {
        let err = NetworkError::not_found(ResourceKind::Endpoint, "bridge");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "endpoint not found: bridge");
    }

    #[test]
    fn test_transport_error_converts() {
        let err: NetworkError = TransportError::attach("link down").into();
        assert!(matches!(err, NetworkError::Transport(_)));
        assert!(!err.is_invalid_state());
    }
}
