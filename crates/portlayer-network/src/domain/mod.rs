//! Domain module for the port layer network subsystem
//!
//! - scope: isolated network segments and their handles
//! - endpoint: one container's attachment to one scope, bind/unbind
//! - container: thread-safe aggregate of a container's endpoints

pub mod container;
pub mod endpoint;
pub mod scope;

pub use container::{Container, ContainerId};
pub use endpoint::{Endpoint, UNASSIGNED_PCI_SLOT};
pub use scope::{Scope, ScopeId, ScopeRegistry, ScopeType};
