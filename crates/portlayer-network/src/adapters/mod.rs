//! Adapters Layer
//!
//! In-process implementations of the outbound ports. A host wiring a real
//! virtualization platform provides its own [`EndpointTransport`].
//!
//! [`EndpointTransport`]: crate::ports::outbound::EndpointTransport

pub mod transport;

pub use transport::{InMemoryTransport, NoOpTransport};
