//! Typed client for the container service.
//!
//! Thin wrapper over the generic [`RpcClient`] stub: one method per catalog
//! entry, with payload plumbing hidden.

use vessel_core::{
    DestroyedFlag, JsonCodec, MassDelta, MassOutcome, Method, PressureReading,
};
use vessel_transport::{Broker, ClientConfig, RpcClient, RpcError, TransportError};

/// A connected container client.
///
/// Owns one reply queue for its lifetime; dropping the client tears the
/// queue down.
#[derive(Debug)]
pub struct ContainerClient {
    rpc: RpcClient<JsonCodec>,
}

impl ContainerClient {
    /// Connect a client under the given role (it appears in the reply
    /// queue name, e.g. `GasPressure.ObserverClient_<id>`).
    ///
    /// # Errors
    ///
    /// Fails if the reply queue cannot be set up.
    pub fn connect(broker: &Broker, role: &str, config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self {
            rpc: RpcClient::connect(broker, role, JsonCodec, config)?,
        })
    }

    /// Read the current derived pressure.
    ///
    /// # Errors
    ///
    /// Transport-level failures only; the read itself cannot be rejected.
    pub async fn pressure(&self) -> Result<f64, RpcError> {
        let reading: PressureReading = self.rpc.call(Method::GetPressure).await?;
        Ok(reading.value)
    }

    /// Read the destroyed flag.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn is_destroyed(&self) -> Result<bool, RpcError> {
        let flag: DestroyedFlag = self.rpc.call(Method::IsDestroyed).await?;
        Ok(flag.value)
    }

    /// Request a mass increase.
    ///
    /// A rejection (threshold not met, container destroyed) arrives as a
    /// normal [`MassOutcome`], not an error.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn increase_mass(&self, amount: f64) -> Result<MassOutcome, RpcError> {
        self.rpc
            .call_with(Method::IncreaseMass, &MassDelta { mass: amount })
            .await
    }

    /// Request a mass decrease.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn decrease_mass(&self, amount: f64) -> Result<MassOutcome, RpcError> {
        self.rpc
            .call_with(Method::DecreaseMass, &MassDelta { mass: amount })
            .await
    }

    /// The client's reply queue name.
    pub fn reply_queue(&self) -> &str {
        self.rpc.reply_queue()
    }
}
