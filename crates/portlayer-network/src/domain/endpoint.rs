//! Endpoint - attachment of one container to one scope
//!
//! ```text
//! [UNBOUND] ──bind──→ [BOUND]
//!     ↑                  │
//!     └──────unbind──────┘
//! ```
//!
//! A failed transport call leaves the endpoint in the state it started in.

use crate::domain::{ContainerId, ScopeId};
use crate::error::{NetworkError, NetworkResult};
use crate::ports::outbound::{AttachRequest, EndpointTransport};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// PCI slot value meaning "no physical slot assigned yet"
pub const UNASSIGNED_PCI_SLOT: i32 = 0;

#[derive(Debug)]
struct EndpointState {
    pci_slot: i32,
    bound: bool,
}

/// Attachment point of one container to one scope
///
/// Shared as `Arc<Endpoint>`; the owning [`Container`](super::Container)
/// compares endpoints by pointer identity. Mutable state sits behind its own
/// lock, which is only ever taken after (never while waiting for) the
/// container lock, and is not held across transport calls. Bind/unbind
/// transitions are serialized by the owning container's lock.
pub struct Endpoint {
    container_id: ContainerId,
    scope: ScopeId,
    transport: Arc<dyn EndpointTransport>,
    state: Mutex<EndpointState>,
}

impl Endpoint {
    pub(crate) fn new(
        container_id: ContainerId,
        scope: ScopeId,
        pci_slot: i32,
        transport: Arc<dyn EndpointTransport>,
    ) -> Self {
        Self {
            container_id,
            scope,
            transport,
            state: Mutex::new(EndpointState {
                pci_slot,
                bound: false,
            }),
        }
    }

    /// Scope this endpoint attaches to
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Container this endpoint belongs to
    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    /// Current PCI slot, [`UNASSIGNED_PCI_SLOT`] if none
    pub fn pci_slot(&self) -> i32 {
        self.state.lock().pci_slot
    }

    /// True once a physical slot has been assigned
    pub fn has_pci_slot(&self) -> bool {
        self.pci_slot() > UNASSIGNED_PCI_SLOT
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().bound
    }

    pub(crate) fn set_pci_slot(&self, slot: i32) {
        self.state.lock().pci_slot = slot;
    }

    /// Activate connectivity on `scope`
    ///
    /// `scope` must be this endpoint's own scope.
    pub(crate) fn bind(&self, scope: &ScopeId) -> NetworkResult<()> {
        self.check_scope(scope)?;

        let request = {
            let state = self.state.lock();
            if state.bound {
                return Err(NetworkError::InvalidState(format!(
                    "endpoint of container {} already bound to scope {}",
                    self.container_id, self.scope
                )));
            }
            self.request(state.pci_slot)
        };

        self.transport.attach(&request)?;
        self.state.lock().bound = true;
        Ok(())
    }

    /// Deactivate connectivity on `scope`
    pub(crate) fn unbind(&self, scope: &ScopeId) -> NetworkResult<()> {
        self.check_scope(scope)?;

        let request = {
            let state = self.state.lock();
            if !state.bound {
                return Err(NetworkError::InvalidState(format!(
                    "endpoint of container {} not bound to scope {}",
                    self.container_id, self.scope
                )));
            }
            self.request(state.pci_slot)
        };

        self.transport.detach(&request)?;
        self.state.lock().bound = false;
        Ok(())
    }

    fn check_scope(&self, scope: &ScopeId) -> NetworkResult<()> {
        if *scope != self.scope {
            return Err(NetworkError::ScopeMismatch {
                expected: self.scope,
                actual: *scope,
            });
        }
        Ok(())
    }

    fn request(&self, pci_slot: i32) -> AttachRequest {
        AttachRequest {
            container_id: self.container_id.clone(),
            scope_id: self.scope,
            pci_slot,
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Endpoint")
            .field("container_id", &self.container_id)
            .field("scope", &self.scope)
            .field("pci_slot", &state.pci_slot)
            .field("bound", &state.bound)
            .finish()
    }
}
