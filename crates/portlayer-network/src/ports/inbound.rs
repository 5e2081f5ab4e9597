//! Driving Ports (API - Inbound)

use crate::domain::{Container, ContainerId, Endpoint, Scope, ScopeId, ScopeType};
use crate::error::NetworkResult;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Primary network-management API
///
/// This is the driving port for the subsystem. Implementations own the
/// registry of containers and are the only callers of the container's
/// membership operations, so they are responsible for the one-endpoint-per-
/// scope and unique-PCI-slot invariants.
pub trait NetworkApi: Send + Sync {
    /// Register a new scope under a unique name
    fn create_scope(&self, name: &str, scope_type: ScopeType) -> NetworkResult<Arc<Scope>>;

    /// Look up a scope by handle
    fn scope(&self, id: &ScopeId) -> Option<Arc<Scope>>;

    /// Look up a scope by name
    fn scope_by_name(&self, name: &str) -> Option<Arc<Scope>>;

    /// Register a compute instance with the network subsystem
    fn register_container(&self, id: ContainerId) -> NetworkResult<Arc<Container>>;

    /// Deregister a compute instance
    ///
    /// Fails if any of its endpoints is still bound.
    fn deregister_container(&self, id: &ContainerId) -> NetworkResult<Arc<Container>>;

    /// Look up a registered container
    fn container(&self, id: &ContainerId) -> Option<Arc<Container>>;

    /// All registered containers, in no particular order
    fn containers(&self) -> Vec<Arc<Container>>;

    /// Attach a container to a scope with a new, unbound endpoint
    ///
    /// `pci_slot` of `0` leaves the slot unassigned. Slot choice is the
    /// caller's; see [`NetworkApi::slots_in_use`].
    fn add_endpoint(
        &self,
        container: &ContainerId,
        scope: &ScopeId,
        pci_slot: i32,
    ) -> NetworkResult<Arc<Endpoint>>;

    /// Assign (or clear, with `0`) the PCI slot of an existing endpoint
    fn assign_pci_slot(
        &self,
        container: &ContainerId,
        scope: &ScopeId,
        pci_slot: i32,
    ) -> NetworkResult<()>;

    /// Detach a container from a scope. The endpoint must be unbound.
    fn remove_endpoint(&self, container: &ContainerId, scope: &ScopeId) -> NetworkResult<()>;

    /// Activate the container's endpoint on `scope`
    fn bind(&self, container: &ContainerId, scope: &ScopeId) -> NetworkResult<()>;

    /// Deactivate the container's endpoint on `scope`
    fn unbind(&self, container: &ContainerId, scope: &ScopeId) -> NetworkResult<()>;

    /// PCI slots currently assigned to the container's endpoints
    fn slots_in_use(&self, container: &ContainerId) -> NetworkResult<BTreeSet<i32>>;
}
