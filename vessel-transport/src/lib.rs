//! # Vessel Transport
//!
//! A thin in-process model of a message broker, plus the client-side RPC
//! stub built on top of it.
//!
//! This crate provides:
//! - **Broker**: one direct-routing exchange, durable shared queues and
//!   exclusive per-client reply queues, with publish/subscribe primitives
//! - **Delivery**: envelope bytes plus out-of-band correlation metadata
//! - **RpcClient**: correlation-tracked request/response calls with a
//!   mandatory per-call timeout

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Broker model: exchange, queues, publish.
pub mod broker;

/// Client RPC stub with correlation tracking.
pub mod client;

/// Client stub configuration.
pub mod config;

/// Delivery metadata carried alongside envelope bytes.
pub mod delivery;

/// Error types for transport operations.
pub mod error;

/// Consumer subscription handles.
pub mod subscription;

pub use broker::{Broker, QueueSpec, QueueStats};
pub use client::RpcClient;
pub use config::ClientConfig;
pub use delivery::Delivery;
pub use error::{RpcError, TransportError};
pub use subscription::Subscription;
