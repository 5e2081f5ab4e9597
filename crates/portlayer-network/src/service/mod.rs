//! # Network Context
//!
//! The network-management service: owns the scope registry and the registry
//! of containers, and is the only caller of a container's membership
//! operations. It discharges the caller-side contract of
//! `Container::add_endpoint`:
//!
//! 1. at most one endpoint per scope per container
//! 2. an assigned PCI slot is unique within the container
//! 3. at most `max_endpoints_per_container` endpoints
//!
//! Locking:
//! - the registry lock is only held long enough to look up, insert or remove
//!   an entry, never across a container operation
//! - each registry entry carries a membership guard held for the whole
//!   check-then-act sequence of add/assign/remove and deregistration
//! - bind/unbind take no service-level lock; the container lock serializes
//!   them against each other and against retirement
//!
//! Order: membership guard, container lock, endpoint lock, registry lock.
//! A slow transport call therefore stalls only its own container.
//!
//! Slot choice stays with the caller: [`NetworkApi::slots_in_use`] reports
//! what is taken.


use crate::config::NetworkConfig;
use crate::domain::{
    Container, ContainerId, Endpoint, Scope, ScopeId, ScopeRegistry, ScopeType,
    UNASSIGNED_PCI_SLOT,
};
use crate::error::{NetworkError, NetworkResult, ResourceKind};
use crate::ports::inbound::NetworkApi;
use crate::ports::outbound::EndpointTransport;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry entry for one container
struct Registration {
    container: Arc<Container>,
    /// Serializes membership changes on `container`
    membership: Mutex<()>,
}

impl Registration {
    fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            membership: Mutex::new(()),
        }
    }

    /// The container, unless deregistration already retired it
    fn live(&self) -> NetworkResult<&Arc<Container>> {
        if self.container.is_retired() {
            return Err(NetworkError::not_found(
                ResourceKind::Container,
                self.container.id(),
            ));
        }
        Ok(&self.container)
    }
}

/// Network-management service
pub struct NetworkContext {
    config: NetworkConfig,
    transport: Arc<dyn EndpointTransport>,
    scopes: ScopeRegistry,
    containers: RwLock<HashMap<ContainerId, Arc<Registration>>>,
}

impl NetworkContext {
    /// Create a context; the configuration is validated first.
    pub fn new(
        config: NetworkConfig,
        transport: Arc<dyn EndpointTransport>,
    ) -> NetworkResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            transport,
            scopes: ScopeRegistry::new(),
            containers: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn scope_registry(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Clone the registry entry out; the registry guard drops before return
    fn registration(&self, id: &ContainerId) -> NetworkResult<Arc<Registration>> {
        self.containers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(ResourceKind::Container, id))
    }

    fn lookup(&self, id: &ContainerId) -> NetworkResult<Arc<Container>> {
        Ok(Arc::clone(&self.registration(id)?.container))
    }

    fn check_slot_range(&self, slot: i32) -> NetworkResult<()> {
        if slot < UNASSIGNED_PCI_SLOT || slot > self.config.max_pci_slot {
            return Err(NetworkError::InvalidSlot {
                slot,
                max: self.config.max_pci_slot,
            });
        }
        Ok(())
    }
}

impl NetworkApi for NetworkContext {
    fn create_scope(&self, name: &str, scope_type: ScopeType) -> NetworkResult<Arc<Scope>> {
        let scope = self.scopes.insert(Scope::new(name, scope_type))?;
        info!(scope = %scope.id(), name, ?scope_type, "Scope created");
        Ok(scope)
    }

    fn scope(&self, id: &ScopeId) -> Option<Arc<Scope>> {
        self.scopes.get(id)
    }

    fn scope_by_name(&self, name: &str) -> Option<Arc<Scope>> {
        self.scopes.by_name(name)
    }

    fn register_container(&self, id: ContainerId) -> NetworkResult<Arc<Container>> {
        let mut containers = self.containers.write();
        if containers.contains_key(&id) {
            warn!(container = %id, "Container already registered");
            return Err(NetworkError::already_exists(ResourceKind::Container, &id));
        }

        let container = Arc::new(Container::new(id.clone()));
        containers.insert(id.clone(), Arc::new(Registration::new(Arc::clone(&container))));
        info!(container = %id, "Container registered");
        Ok(container)
    }

    fn deregister_container(&self, id: &ContainerId) -> NetworkResult<Arc<Container>> {
        let registration = self.registration(id)?;
        let _membership = registration.membership.lock();
        let container = &registration.container;

        if let Err(e) = container.retire() {
            if e.is_invalid_state() {
                warn!(container = %id, "Refusing to deregister container with bound endpoints");
            }
            return Err(e);
        }

        {
            let mut containers = self.containers.write();
            if containers
                .get(id)
                .is_some_and(|entry| Arc::ptr_eq(entry, &registration))
            {
                containers.remove(id);
            }
        }
        info!(container = %id, endpoints = container.len(), "Container deregistered");
        Ok(Arc::clone(container))
    }

    fn container(&self, id: &ContainerId) -> Option<Arc<Container>> {
        self.containers
            .read()
            .get(id)
            .map(|entry| Arc::clone(&entry.container))
    }

    fn containers(&self) -> Vec<Arc<Container>> {
        self.containers
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.container))
            .collect()
    }

    fn add_endpoint(
        &self,
        container_id: &ContainerId,
        scope: &ScopeId,
        pci_slot: i32,
    ) -> NetworkResult<Arc<Endpoint>> {
        let registration = self.registration(container_id)?;
        let _membership = registration.membership.lock();
        let container = registration.live()?;

        if !self.scopes.contains(scope) {
            return Err(NetworkError::not_found(ResourceKind::Scope, scope));
        }
        if container.endpoint(scope).is_some() {
            warn!(
                container = %container_id,
                scope = %scope,
                "Container already attached to scope"
            );
            return Err(NetworkError::already_exists(
                ResourceKind::Endpoint,
                format!("{container_id}/{scope}"),
            ));
        }
        if container.len() >= self.config.max_endpoints_per_container {
            return Err(NetworkError::EndpointLimit {
                container: container_id.clone(),
                limit: self.config.max_endpoints_per_container,
            });
        }
        self.check_slot_range(pci_slot)?;
        if pci_slot > UNASSIGNED_PCI_SLOT && container.collect_slot_numbers().contains(&pci_slot) {
            return Err(NetworkError::SlotInUse { slot: pci_slot });
        }

        let endpoint = Arc::new(Endpoint::new(
            container_id.clone(),
            *scope,
            pci_slot,
            Arc::clone(&self.transport),
        ));
        container.add_endpoint(Arc::clone(&endpoint));
        debug!(container = %container_id, scope = %scope, pci_slot, "Endpoint added");
        Ok(endpoint)
    }

    fn assign_pci_slot(
        &self,
        container_id: &ContainerId,
        scope: &ScopeId,
        pci_slot: i32,
    ) -> NetworkResult<()> {
        let registration = self.registration(container_id)?;
        let _membership = registration.membership.lock();
        let container = registration.live()?;
        let endpoint = container
            .endpoint(scope)
            .ok_or_else(|| NetworkError::not_found(ResourceKind::Endpoint, scope))?;

        self.check_slot_range(pci_slot)?;
        if endpoint.pci_slot() == pci_slot {
            return Ok(());
        }
        if pci_slot > UNASSIGNED_PCI_SLOT && container.collect_slot_numbers().contains(&pci_slot) {
            return Err(NetworkError::SlotInUse { slot: pci_slot });
        }

        endpoint.set_pci_slot(pci_slot);
        debug!(container = %container_id, scope = %scope, pci_slot, "PCI slot assigned");
        Ok(())
    }

    fn remove_endpoint(&self, container_id: &ContainerId, scope: &ScopeId) -> NetworkResult<()> {
        let registration = self.registration(container_id)?;
        let _membership = registration.membership.lock();
        let container = registration.live()?;

        if let Err(e) = container.remove_unbound(scope) {
            if e.is_invalid_state() {
                warn!(
                    container = %container_id,
                    scope = %scope,
                    "Refusing to remove bound endpoint"
                );
            }
            return Err(e);
        }
        debug!(container = %container_id, scope = %scope, "Endpoint removed");
        Ok(())
    }

    fn bind(&self, container_id: &ContainerId, scope: &ScopeId) -> NetworkResult<()> {
        let container = self.lookup(container_id)?;

        match container.bind(scope) {
            Ok(()) => {
                info!(container = %container_id, scope = %scope, "Endpoint bound");
                Ok(())
            }
            Err(e) => {
                warn!(container = %container_id, scope = %scope, error = %e, "Bind failed");
                Err(e)
            }
        }
    }

    fn unbind(&self, container_id: &ContainerId, scope: &ScopeId) -> NetworkResult<()> {
        let container = self.lookup(container_id)?;

        match container.unbind(scope) {
            Ok(()) => {
                info!(container = %container_id, scope = %scope, "Endpoint unbound");
                Ok(())
            }
            Err(e) => {
                warn!(container = %container_id, scope = %scope, error = %e, "Unbind failed");
                Err(e)
            }
        }
    }

    fn slots_in_use(&self, container_id: &ContainerId) -> NetworkResult<BTreeSet<i32>> {
        let container = self.lookup(container_id)?;
        Ok(container.collect_slot_numbers())
    }
}
