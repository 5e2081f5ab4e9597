//! Container - per-compute-instance aggregate of endpoints
//!
//! All state sits behind one coarse lock per container. Reads take it too so
//! that every returned collection is a snapshot of a single instant.
//! Operations on one container are strictly serialized; different containers
//! never contend.
//!
//! Lock order: container lock, then endpoint lock. Bind/unbind keep the
//! container lock across the transport call; the endpoint lock is released
//! before it.

use crate::domain::{Endpoint, ScopeId};
use crate::error::{NetworkError, NetworkResult, ResourceKind};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identifier of a compute instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Default)]
struct ContainerState {
    endpoints: Vec<Arc<Endpoint>>,
    /// Set once by deregistration; no endpoint can be bound afterwards
    retired: bool,
}

/// Network view of one compute instance
///
/// INVARIANT: at most one endpoint per scope. `add_endpoint` does not check
/// it; the caller (see [`NetworkContext`](crate::service::NetworkContext))
/// must.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    state: Mutex<ContainerState>,
}

impl Container {
    pub(crate) fn new(id: ContainerId) -> Self {
        Self {
            id,
            state: Mutex::new(ContainerState::default()),
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Snapshot of the endpoints, in insertion order
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.state.lock().endpoints.clone()
    }

    /// Endpoint attached to `scope`, if any
    pub fn endpoint(&self, scope: &ScopeId) -> Option<Arc<Endpoint>> {
        let state = self.state.lock();
        Self::find(&state.endpoints, scope).cloned()
    }

    /// Snapshot of the scopes this container is attached to, one per endpoint
    pub fn scopes(&self) -> Vec<ScopeId> {
        self.state.lock().endpoints.iter().map(|e| e.scope()).collect()
    }

    /// Activate the endpoint for `scope`
    ///
    /// The container lock is held across the transport call. Fails with
    /// `ResourceNotFound` once the container has been deregistered.
    pub fn bind(&self, scope: &ScopeId) -> NetworkResult<()> {
        let state = self.state.lock();
        let endpoint = self.live_endpoint(&state, scope)?;

        endpoint.bind(scope)
    }

    /// Deactivate the endpoint for `scope`
    pub fn unbind(&self, scope: &ScopeId) -> NetworkResult<()> {
        let state = self.state.lock();
        let endpoint = self.live_endpoint(&state, scope)?;

        endpoint.unbind(scope)
    }

    /// Number of endpoints
    pub fn len(&self) -> usize {
        self.state.lock().endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if any endpoint is currently bound
    pub fn has_bound_endpoints(&self) -> bool {
        self.state.lock().endpoints.iter().any(|e| e.is_bound())
    }

    /// True once the container has been deregistered
    pub fn is_retired(&self) -> bool {
        self.state.lock().retired
    }

    /// Append an endpoint. Scope uniqueness is the caller's responsibility.
    pub(crate) fn add_endpoint(&self, endpoint: Arc<Endpoint>) {
        self.state.lock().endpoints.push(endpoint);
    }

    /// Remove this exact endpoint; absent endpoints are ignored
    #[allow(dead_code)] // The service removes through remove_unbound
    pub(crate) fn remove_endpoint(&self, endpoint: &Arc<Endpoint>) {
        Self::take(&mut self.state.lock().endpoints, endpoint);
    }

    /// Remove the endpoint for `scope`, refusing while it is bound
    ///
    /// Lookup, check and removal happen under one lock acquisition, so a
    /// concurrent bind cannot slip in between.
    pub(crate) fn remove_unbound(&self, scope: &ScopeId) -> NetworkResult<Arc<Endpoint>> {
        let mut state = self.state.lock();
        let endpoint = Self::find(&state.endpoints, scope)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(ResourceKind::Endpoint, scope))?;

        if endpoint.is_bound() {
            return Err(NetworkError::InvalidState(format!(
                "endpoint of container {} on scope {scope} is still bound",
                self.id
            )));
        }

        Self::take(&mut state.endpoints, &endpoint);
        Ok(endpoint)
    }

    /// PCI slots assigned to any endpoint (slot > 0)
    pub(crate) fn collect_slot_numbers(&self) -> BTreeSet<i32> {
        self.state
            .lock()
            .endpoints
            .iter()
            .map(|e| e.pci_slot())
            .filter(|slot| *slot > 0)
            .collect()
    }

    /// Mark the container deregistered
    ///
    /// Checked and set under the container lock, so a concurrent bind either
    /// completes first (and retirement is refused) or sees the container as
    /// gone.
    pub(crate) fn retire(&self) -> NetworkResult<()> {
        let mut state = self.state.lock();
        if state.retired {
            return Err(NetworkError::not_found(ResourceKind::Container, &self.id));
        }
        if state.endpoints.iter().any(|e| e.is_bound()) {
            return Err(NetworkError::InvalidState(format!(
                "container {} still has bound endpoints",
                self.id
            )));
        }

        state.retired = true;
        Ok(())
    }

    fn live_endpoint<'a>(
        &self,
        state: &'a ContainerState,
        scope: &ScopeId,
    ) -> NetworkResult<&'a Arc<Endpoint>> {
        if state.retired {
            return Err(NetworkError::not_found(ResourceKind::Container, &self.id));
        }
        Self::find(&state.endpoints, scope)
            .ok_or_else(|| NetworkError::not_found(ResourceKind::Endpoint, scope))
    }

    fn take(endpoints: &mut Vec<Arc<Endpoint>>, endpoint: &Arc<Endpoint>) {
        endpoints.retain(|e| !Arc::ptr_eq(e, endpoint));
    }

    fn find<'a>(endpoints: &'a [Arc<Endpoint>], scope: &ScopeId) -> Option<&'a Arc<Endpoint>> {
        endpoints.iter().find(|e| e.scope() == *scope)
    }
}
