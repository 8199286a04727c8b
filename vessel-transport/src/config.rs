//! Configuration for the client RPC stub.

use std::time::Duration;

/// Tunables for one [`RpcClient`](crate::RpcClient) instance.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Upper bound on every call's wait for a reply.
    ///
    /// A reply can be silently lost (torn-down queue, dropped request, a
    /// server that declined to answer), so every wait is bounded; when the
    /// bound elapses the call fails with
    /// [`RpcError::Timeout`](crate::RpcError::Timeout).
    pub call_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Configuration with a specific call timeout.
    pub fn with_call_timeout(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }
}
