//! # Vessel Service
//!
//! The gas-pressure domain on top of the vessel transport.
//!
//! One authoritative server process owns a sealed gas container: its
//! temperature drifts under a periodic background driver, remote parties
//! add and remove mass through RPC calls, and pressure is derived from
//! both. This crate provides:
//! - **Engine**: the lock-guarded container state and its operations
//! - **Driver**: the periodic temperature perturbation task
//! - **Dispatch**: the server-side request router
//! - **Client**: the typed container client over the generic RPC stub

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Typed client for the container service.
pub mod client;

/// Server-side request dispatching.
pub mod dispatch;

/// Background temperature driver.
pub mod driver;

/// Container state engine.
pub mod engine;

pub use client::ContainerClient;
pub use dispatch::ServiceDispatcher;
pub use driver::{DriverConfig, TemperatureDriver, TemperatureNoise, UniformNoise};
pub use engine::{
    ContainerEngine, CycleOutcome, DestructionCause, EngineConfig, EngineError, MassAdjustment,
    RejectReason, ThresholdLimits,
};
