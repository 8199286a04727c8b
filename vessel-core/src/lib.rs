//! # Vessel Core
//!
//! Wire-level vocabulary shared by the gas-pressure server and its clients.
//!
//! This crate provides:
//! - **Codec**: pluggable message serialization with a JSON default
//! - **Correlation**: opaque per-call identifiers for request/response pairing
//! - **Envelope**: the two-field RPC envelope and the typed method catalog
//! - **Topology**: the broker names every participant must agree on

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Pluggable message serialization.
pub mod codec;

/// Opaque request/response correlation identifiers.
pub mod correlation;

/// RPC envelope, method catalog and typed payloads.
pub mod envelope;

/// Broker topology constants.
pub mod topology;

mod macros;

pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use correlation::CorrelationId;
pub use envelope::{
    DecodeError, DestroyedFlag, MassDelta, MassOutcome, Method, PressureReading, RpcEnvelope,
    ServiceRequest,
};
