//! Delivery: envelope bytes plus out-of-band metadata.

use vessel_core::CorrelationId;

/// One message as the broker carries it.
///
/// The body holds the encoded envelope; correlation identity and the reply
/// address travel alongside it as metadata, and the broker preserves both
/// unchanged from publish to delivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Encoded [`RpcEnvelope`](vessel_core::RpcEnvelope) bytes.
    pub body: Vec<u8>,
    /// Token pairing a request with its response.
    pub correlation_id: Option<CorrelationId>,
    /// Routing key of the queue the response should be published to.
    pub reply_to: Option<String>,
}

impl Delivery {
    /// A delivery carrying only a body, with no metadata.
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            correlation_id: None,
            reply_to: None,
        }
    }

    /// Attach a correlation identifier.
    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Attach a reply address.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}
