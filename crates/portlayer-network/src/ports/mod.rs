//! Ports Layer
//!
//! - `inbound`: the API the network-management subsystem exposes
//! - `outbound`: the transport the endpoints drive

pub mod inbound;
pub mod outbound;

pub use inbound::NetworkApi;
pub use outbound::{AttachRequest, EndpointTransport, TransportError, TransportOperation};
