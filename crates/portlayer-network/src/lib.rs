//! # portlayer-network
//!
//! Network attachment state of compute instances ("containers").
//!
//! ## Overview
//!
//! A container joins one or more isolated network segments ("scopes")
//! through one endpoint per scope. This crate provides:
//! - **Endpoint**: scope handle, PCI slot, and the bound/unbound toggle
//! - **Container**: thread-safe aggregate of a container's endpoints with
//!   point-in-time snapshots and per-scope bind/unbind
//! - **NetworkContext**: the network-management service that registers
//!   containers and scopes and keeps the per-container invariants
//!
//! ## Architecture
//!
//! ```text
//! NetworkApi (inbound)
//!      │
//!      ▼
//! NetworkContext ──owns──→ Container ──owns──→ Endpoint ──→ EndpointTransport
//!      │                                          │          (outbound)
//!      └──────────── ScopeRegistry ←──ScopeId─────┘
//! ```
//!
//! ## Locking
//!
//! One lock per container serializes every operation on that container,
//! including the transport call made by bind/unbind. The service never holds
//! its registry lock across a container operation, so containers never
//! contend with each other.
//!
//! ## Example
//!
//! ```rust
//! use portlayer_network::{
//!     ContainerId, InMemoryTransport, NetworkApi, NetworkConfig, NetworkContext, ScopeType,
//! };
//! use std::sync::Arc;
//!
//! let context = NetworkContext::new(
//!     NetworkConfig::default(),
//!     Arc::new(InMemoryTransport::new()),
//! )?;
//!
//! let bridge = context.create_scope("bridge", ScopeType::Bridge)?;
//! let id = ContainerId::new("c1");
//! context.register_container(id.clone())?;
//!
//! let free_slot = (1..).find(|s| !context.slots_in_use(&id).unwrap().contains(s)).unwrap();
//! context.add_endpoint(&id, &bridge.id(), free_slot)?;
//! context.bind(&id, &bridge.id())?;
//!
//! let container = context.container(&id).unwrap();
//! assert_eq!(container.scopes(), vec![bridge.id()]);
//! # Ok::<(), portlayer_network::NetworkError>(())
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryTransport, NoOpTransport};
pub use config::NetworkConfig;
pub use domain::{
    Container, ContainerId, Endpoint, Scope, ScopeId, ScopeRegistry, ScopeType,
    UNASSIGNED_PCI_SLOT,
};
pub use error::{NetworkError, NetworkResult, ResourceKind};
pub use ports::inbound::NetworkApi;
pub use ports::outbound::{AttachRequest, EndpointTransport, TransportError, TransportOperation};
pub use service::NetworkContext;
