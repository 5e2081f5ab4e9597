//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The host supplies the transport that actually wires an endpoint's virtual
//! NIC into a scope. Calls are synchronous and may block on platform I/O.

use crate::domain::{ContainerId, ScopeId};
use std::fmt;
use thiserror::Error;

/// Everything a transport needs to attach or detach one endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachRequest {
    pub container_id: ContainerId,
    pub scope_id: ScopeId,
    /// PCI slot of the endpoint's NIC, `0` when not yet assigned
    pub pci_slot: i32,
}

/// Which transport operation failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportOperation {
    Attach,
    Detach,
}

impl fmt::Display for TransportOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportOperation::Attach => f.write_str("attach"),
            TransportOperation::Detach => f.write_str("detach"),
        }
    }
}

/// Failure reported by an [`EndpointTransport`]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{operation} failed: {reason}")]
pub struct TransportError {
    pub operation: TransportOperation,
    pub reason: String,
}

impl TransportError {
    pub fn attach(reason: impl Into<String>) -> Self {
        Self {
            operation: TransportOperation::Attach,
            reason: reason.into(),
        }
    }

    pub fn detach(reason: impl Into<String>) -> Self {
        Self {
            operation: TransportOperation::Detach,
            reason: reason.into(),
        }
    }
}

/// Attach/detach an endpoint's network connectivity on its scope
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one transport is shared by every
/// endpoint of every container. The container lock is held for the whole
/// duration of a call, so a slow transport serializes operations on that
/// one container but never blocks other containers.
pub trait EndpointTransport: Send + Sync {
    /// Activate connectivity for the endpoint described by `request`
    fn attach(&self, request: &AttachRequest) -> Result<(), TransportError>;

    /// Deactivate connectivity for the endpoint described by `request`
    fn detach(&self, request: &AttachRequest) -> Result<(), TransportError>;
}
