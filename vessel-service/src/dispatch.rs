//! Server-side request dispatching.
//!
//! One [`ServiceDispatcher`] per server process. It owns the engine
//! reference, consumes the shared service queue, routes each decoded
//! request to the matching engine operation and publishes the correlated
//! reply to the caller's reply queue.
//!
//! Per-delivery failures never escape: a malformed envelope, an unknown
//! action or a missing reply address is logged and dropped, and the
//! consumer keeps draining the queue. The affected caller discovers the
//! loss through its own timeout.

use std::sync::Arc;

use tracing::{debug, warn};
use vessel_core::{
    CodecError, DecodeError, DestroyedFlag, MassOutcome, MessageCodec, Method, PressureReading,
    RpcEnvelope, ServiceRequest, topology,
};
use vessel_transport::{Broker, Delivery, QueueSpec, Subscription, TransportError};

use crate::engine::{ContainerEngine, MassAdjustment};

/// Routes service-queue deliveries to the container engine.
pub struct ServiceDispatcher<C: MessageCodec> {
    engine: Arc<ContainerEngine>,
    broker: Broker,
    codec: C,
}

impl<C: MessageCodec> ServiceDispatcher<C> {
    /// Build a dispatcher over an engine and a broker handle.
    pub fn new(engine: Arc<ContainerEngine>, broker: Broker, codec: C) -> Self {
        Self {
            engine,
            broker,
            codec,
        }
    }

    /// Declare and bind the service queue, then start consuming.
    ///
    /// # Errors
    ///
    /// Fails if the service queue cannot be declared, bound or consumed
    /// (for instance when a second dispatcher is started on one broker).
    pub fn start(self) -> Result<Subscription, TransportError> {
        let Self {
            engine,
            broker,
            codec,
        } = self;
        broker.declare_queue(QueueSpec::durable(topology::SERVICE_QUEUE))?;
        broker.bind(topology::SERVICE_QUEUE, topology::SERVICE_ROUTING_KEY)?;

        let responder = broker.clone();
        let subscription = broker.subscribe(topology::SERVICE_QUEUE, move |delivery| {
            if let Err(reason) = handle_delivery(&engine, &responder, &codec, delivery) {
                warn!(%reason, "dropping request");
            }
        })?;
        debug!(queue = topology::SERVICE_QUEUE, "dispatcher consuming");
        Ok(subscription)
    }
}

/// Why one delivery was dropped without a reply.
#[derive(Debug, thiserror::Error)]
enum DropReason {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Request(#[from] DecodeError),

    #[error("request has no reply address")]
    NoReplyAddress,
}

fn handle_delivery<C: MessageCodec>(
    engine: &ContainerEngine,
    broker: &Broker,
    codec: &C,
    delivery: Delivery,
) -> Result<(), DropReason> {
    let envelope: RpcEnvelope = codec.decode(&delivery.body)?;
    let request = ServiceRequest::decode(&envelope, codec)?;
    let reply_to = delivery.reply_to.as_deref().ok_or(DropReason::NoReplyAddress)?;
    debug!(
        method = %request.method(),
        correlation_id = ?delivery.correlation_id,
        "handling request"
    );

    let reply = match &request {
        ServiceRequest::GetPressure => RpcEnvelope::result(
            Method::GetPressure,
            &PressureReading {
                value: engine.pressure(),
            },
            codec,
        ),
        ServiceRequest::IsDestroyed => RpcEnvelope::result(
            Method::IsDestroyed,
            &DestroyedFlag {
                value: engine.is_destroyed(),
            },
            codec,
        ),
        ServiceRequest::IncreaseMass(delta) => RpcEnvelope::result(
            Method::IncreaseMass,
            &outcome_payload(engine.increase_mass(delta.mass)),
            codec,
        ),
        ServiceRequest::DecreaseMass(delta) => RpcEnvelope::result(
            Method::DecreaseMass,
            &outcome_payload(engine.decrease_mass(delta.mass)),
            codec,
        ),
    }?;

    // The reply reuses the incoming correlation id unchanged; if the reply
    // queue was torn down meanwhile, the broker drops this silently.
    let mut out = Delivery::new(codec.encode(&reply)?);
    out.correlation_id = delivery.correlation_id;
    broker.publish(reply_to, out);
    Ok(())
}

fn outcome_payload(adjustment: MassAdjustment) -> MassOutcome {
    match adjustment {
        MassAdjustment::Applied { .. } => MassOutcome {
            is_success: true,
            failure_reason: None,
        },
        MassAdjustment::Rejected(reason) => MassOutcome {
            is_success: false,
            failure_reason: Some(reason.message().to_string()),
        },
    }
}
