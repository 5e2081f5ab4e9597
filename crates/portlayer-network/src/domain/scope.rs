//! Scopes - isolated network segments endpoints attach to
//!
//! A scope is identified by a [`ScopeId`] minted when the scope is built.
//! Endpoints hold the handle, never the scope itself; the [`ScopeRegistry`]
//! resolves handles back to scopes.

use crate::error::{NetworkError, NetworkResult, ResourceKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque handle to a [`Scope`]
///
/// Equal iff both handles came from the same [`Scope::new`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(Uuid);

impl ScopeId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of network segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScopeType {
    /// Private segment bridged between containers on one host
    #[default]
    Bridge,
    /// Segment mapped directly onto an external network
    External,
}

/// Isolated network segment
#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    name: String,
    scope_type: ScopeType,
}

impl Scope {
    pub fn new(name: impl Into<String>, scope_type: ScopeType) -> Self {
        Self {
            id: ScopeId::generate(),
            name: name.into(),
            scope_type,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope_type(&self) -> ScopeType {
        self.scope_type
    }
}

/// Thread-safe lookup from [`ScopeId`] (and name) to [`Scope`]
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: RwLock<HashMap<ScopeId, Arc<Scope>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope. Names are unique within a registry.
    pub fn insert(&self, scope: Scope) -> NetworkResult<Arc<Scope>> {
        let mut scopes = self.scopes.write();
        if scopes.values().any(|s| s.name == scope.name) {
            return Err(NetworkError::already_exists(ResourceKind::Scope, &scope.name));
        }

        let scope = Arc::new(scope);
        scopes.insert(scope.id, Arc::clone(&scope));
        Ok(scope)
    }

    pub fn get(&self, id: &ScopeId) -> Option<Arc<Scope>> {
        self.scopes.read().get(id).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Scope>> {
        self.scopes
            .read()
            .values()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn contains(&self, id: &ScopeId) -> bool {
        self.scopes.read().contains_key(id)
    }

    pub fn list(&self) -> Vec<Arc<Scope>> {
        self.scopes.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.scopes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
