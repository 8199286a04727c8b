//! Client-side RPC stub.
//!
//! One [`RpcClient`] owns one exclusive reply queue for its whole lifetime
//! and multiplexes every call over it. Each call draws a fresh
//! [`CorrelationId`], registers a one-shot pending entry, publishes the
//! request toward the server queue and awaits the matching reply under the
//! configured timeout.
//!
//! The reply-queue consumer is a demultiplexer: a delivery completes a call
//! only when both the correlation identifier and the expected
//! `Result_<Method>` action match. Anything else — stale replies from timed
//! out calls, duplicates, foreign actions — is logged and ignored without
//! touching the pending call's state.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use vessel_core::{CorrelationId, MessageCodec, Method, RpcEnvelope, topology};

use crate::broker::{Broker, QueueSpec};
use crate::config::ClientConfig;
use crate::delivery::Delivery;
use crate::error::{RpcError, TransportError};
use crate::subscription::Subscription;

type PendingMap = Arc<Mutex<HashMap<CorrelationId, PendingCall>>>;

struct PendingCall {
    expected_action: &'static str,
    tx: tokio::sync::oneshot::Sender<RpcEnvelope>,
}

/// Client RPC stub over the broker.
///
/// Dropping the stub tears down its reply queue; replies still in flight
/// are then dropped silently by the broker.
pub struct RpcClient<C: MessageCodec> {
    broker: Broker,
    codec: C,
    config: ClientConfig,
    reply_queue: String,
    pending: PendingMap,
    _subscription: Subscription,
}

impl<C: MessageCodec> RpcClient<C> {
    /// Connect a stub: declare and bind an exclusive reply queue named
    /// after `role`, and attach the demultiplexing consumer.
    ///
    /// # Errors
    ///
    /// Fails if the reply queue cannot be declared, bound or consumed.
    pub fn connect(
        broker: &Broker,
        role: &str,
        codec: C,
        config: ClientConfig,
    ) -> Result<Self, TransportError> {
        let reply_queue = topology::reply_queue_name(role, CorrelationId::fresh());
        broker.declare_queue(QueueSpec::exclusive(reply_queue.clone()))?;
        broker.bind(&reply_queue, &reply_queue)?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let subscription = broker.subscribe(
            &reply_queue,
            demultiplexer(pending.clone(), codec.clone(), reply_queue.clone()),
        )?;
        debug!(queue = %reply_queue, "client stub connected");

        Ok(Self {
            broker: broker.clone(),
            codec,
            config,
            reply_queue,
            pending,
            _subscription: subscription,
        })
    }

    /// The stub's reply queue name.
    pub fn reply_queue(&self) -> &str {
        &self.reply_queue
    }

    /// Calls currently awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.lock_pending().len()
    }

    /// Invoke a payload-less method and await its typed result.
    ///
    /// # Errors
    ///
    /// Fails with [`RpcError::Timeout`] when no matching reply arrives in
    /// time; semantic rejections are not errors and arrive inside `Resp`.
    pub async fn call<Resp>(&self, method: Method) -> Result<Resp, RpcError>
    where
        Resp: DeserializeOwned,
    {
        self.dispatch(method, RpcEnvelope::call(method)).await
    }

    /// Invoke a method carrying a request payload and await its result.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call), plus encode failures for the payload.
    pub async fn call_with<Req, Resp>(&self, method: Method, payload: &Req) -> Result<Resp, RpcError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let envelope = RpcEnvelope::call_with(method, payload, &self.codec)?;
        self.dispatch(method, envelope).await
    }

    /// Publish a request that expects no result.
    ///
    /// No method in the current catalog is one-way, but the mechanism
    /// supports it: the call returns as soon as the request is published.
    ///
    /// # Errors
    ///
    /// Fails only if the envelope cannot be encoded.
    pub fn notify(&self, envelope: &RpcEnvelope) -> Result<(), RpcError> {
        let body = self.codec.encode(envelope)?;
        self.broker.publish(
            topology::SERVICE_ROUTING_KEY,
            Delivery::new(body).with_correlation_id(CorrelationId::fresh()),
        );
        Ok(())
    }

    async fn dispatch<Resp>(&self, method: Method, envelope: RpcEnvelope) -> Result<Resp, RpcError>
    where
        Resp: DeserializeOwned,
    {
        let body = self.codec.encode(&envelope)?;
        let correlation_id = CorrelationId::fresh();
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.lock_pending().insert(
            correlation_id,
            PendingCall {
                expected_action: method.result_action(),
                tx,
            },
        );

        self.broker.publish(
            topology::SERVICE_ROUTING_KEY,
            Delivery::new(body)
                .with_correlation_id(correlation_id)
                .with_reply_to(self.reply_queue.clone()),
        );

        match tokio::time::timeout(self.config.call_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply.decode_data(&self.codec)?),
            Ok(Err(_)) => {
                self.lock_pending().remove(&correlation_id);
                Err(RpcError::ReplyDropped)
            }
            Err(_) => {
                self.lock_pending().remove(&correlation_id);
                debug!(%correlation_id, method = %method, "call timed out");
                Err(RpcError::Timeout {
                    timeout: self.config.call_timeout,
                })
            }
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<CorrelationId, PendingCall>> {
        self.pending.lock().expect("pending call map lock poisoned")
    }
}

impl<C: MessageCodec> Drop for RpcClient<C> {
    fn drop(&mut self) {
        self.broker.delete_queue(&self.reply_queue);
    }
}

impl<C: MessageCodec> std::fmt::Debug for RpcClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("reply_queue", &self.reply_queue)
            .field("pending", &self.pending_calls())
            .finish()
    }
}

/// Build the reply-queue consumer closure.
///
/// Completes at most one pending call per delivery, and only on a full
/// correlation-id + action match.
fn demultiplexer<C: MessageCodec>(
    pending: PendingMap,
    codec: C,
    queue: String,
) -> impl FnMut(Delivery) + Send + 'static {
    move |delivery: Delivery| {
        let envelope: RpcEnvelope = match codec.decode(&delivery.body) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(queue = %queue, %error, "discarding undecodable reply");
                return;
            }
        };
        let Some(correlation_id) = delivery.correlation_id else {
            warn!(queue = %queue, action = %envelope.action, "discarding reply without correlation id");
            return;
        };
        let mut pending = pending.lock().expect("pending call map lock poisoned");
        match pending.entry(correlation_id) {
            Entry::Occupied(entry) if entry.get().expected_action == envelope.action => {
                let call = entry.remove();
                // The caller may have timed out concurrently; a failed send
                // is just a reply nobody is waiting for anymore.
                let _ = call.tx.send(envelope);
            }
            Entry::Occupied(entry) => {
                warn!(
                    %correlation_id,
                    expected = entry.get().expected_action,
                    got = %envelope.action,
                    "reply action does not match pending call; ignoring"
                );
            }
            Entry::Vacant(_) => {
                debug!(
                    %correlation_id,
                    action = %envelope.action,
                    "reply for unknown or completed call; ignoring"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vessel_core::{DestroyedFlag, JsonCodec, PressureReading, ServiceRequest};

    use super::*;

    /// Minimal in-test server: answers GetPressure with a fixed reading and
    /// IsDestroyed with `false`, echoing correlation metadata.
    fn spawn_fixed_server(broker: &Broker, pressure: f64) -> Subscription {
        broker
            .declare_queue(QueueSpec::durable(topology::SERVICE_QUEUE))
            .expect("declare service queue");
        broker
            .bind(topology::SERVICE_QUEUE, topology::SERVICE_ROUTING_KEY)
            .expect("bind service queue");

        let responder = broker.clone();
        broker
            .subscribe(topology::SERVICE_QUEUE, move |delivery| {
                let envelope: RpcEnvelope =
                    JsonCodec.decode(&delivery.body).expect("request decodes");
                let request =
                    ServiceRequest::decode(&envelope, &JsonCodec).expect("request is typed");
                let reply = match request {
                    ServiceRequest::GetPressure => RpcEnvelope::result(
                        Method::GetPressure,
                        &PressureReading { value: pressure },
                        &JsonCodec,
                    ),
                    ServiceRequest::IsDestroyed => RpcEnvelope::result(
                        Method::IsDestroyed,
                        &DestroyedFlag { value: false },
                        &JsonCodec,
                    ),
                    other => panic!("unexpected request: {:?}", other),
                }
                .expect("reply encodes");
                let reply_to = delivery.reply_to.expect("reply address present");
                let mut out = Delivery::new(JsonCodec.encode(&reply).expect("encode"));
                out.correlation_id = delivery.correlation_id;
                responder.publish(&reply_to, out);
            })
            .expect("subscribe service queue")
    }

    fn quick_config() -> ClientConfig {
        ClientConfig::with_call_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn call_roundtrip() {
        let broker = Broker::new("Test.Exchange");
        let _server = spawn_fixed_server(&broker, 130.8);

        let client = RpcClient::connect(&broker, "Observer", JsonCodec, quick_config())
            .expect("connect");
        let reading: PressureReading = client.call(Method::GetPressure).await.expect("call");
        assert!((reading.value - 130.8).abs() < f64::EPSILON);
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_independently() {
        let broker = Broker::new("Test.Exchange");
        let _server = spawn_fixed_server(&broker, 42.0);

        let client = RpcClient::connect(&broker, "Observer", JsonCodec, quick_config())
            .expect("connect");
        let (pressure, destroyed) = tokio::join!(
            client.call::<PressureReading>(Method::GetPressure),
            client.call::<DestroyedFlag>(Method::IsDestroyed),
        );
        assert!((pressure.expect("pressure call").value - 42.0).abs() < f64::EPSILON);
        assert!(!destroyed.expect("destroyed call").value);
    }

    #[tokio::test]
    async fn timeout_without_server_cleans_pending_entry() {
        let broker = Broker::new("Test.Exchange");
        // Service queue exists but nothing consumes it.
        broker
            .declare_queue(QueueSpec::durable(topology::SERVICE_QUEUE))
            .expect("declare service queue");
        broker
            .bind(topology::SERVICE_QUEUE, topology::SERVICE_ROUTING_KEY)
            .expect("bind service queue");

        let client = RpcClient::connect(&broker, "Operator", JsonCodec, quick_config())
            .expect("connect");
        let err = client
            .call::<PressureReading>(Method::GetPressure)
            .await
            .expect_err("must time out");
        assert!(matches!(err, RpcError::Timeout { .. }));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn stale_reply_is_ignored_and_next_call_survives() {
        let broker = Broker::new("Test.Exchange");
        let _server = spawn_fixed_server(&broker, 9.5);

        let client = RpcClient::connect(&broker, "Observer", JsonCodec, quick_config())
            .expect("connect");

        // A reply for a correlation id nobody is waiting on.
        let stale = RpcEnvelope::result(
            Method::GetPressure,
            &PressureReading { value: 1.0 },
            &JsonCodec,
        )
        .expect("encode");
        broker.publish(
            client.reply_queue(),
            Delivery::new(JsonCodec.encode(&stale).expect("encode"))
                .with_correlation_id(CorrelationId::fresh()),
        );

        let reading: PressureReading = client.call(Method::GetPressure).await.expect("call");
        assert!((reading.value - 9.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn mismatched_action_does_not_complete_the_call() {
        let broker = Broker::new("Test.Exchange");
        broker
            .declare_queue(QueueSpec::durable(topology::SERVICE_QUEUE))
            .expect("declare service queue");
        broker
            .bind(topology::SERVICE_QUEUE, topology::SERVICE_ROUTING_KEY)
            .expect("bind service queue");

        // A server that answers GetPressure with the wrong result action.
        let responder = broker.clone();
        let _server = broker
            .subscribe(topology::SERVICE_QUEUE, move |delivery| {
                let reply = RpcEnvelope::result(
                    Method::IsDestroyed,
                    &DestroyedFlag { value: true },
                    &JsonCodec,
                )
                .expect("encode");
                let mut out = Delivery::new(JsonCodec.encode(&reply).expect("encode"));
                out.correlation_id = delivery.correlation_id;
                responder.publish(&delivery.reply_to.expect("reply address"), out);
            })
            .expect("subscribe");

        let client = RpcClient::connect(&broker, "Observer", JsonCodec, quick_config())
            .expect("connect");
        let err = client
            .call::<PressureReading>(Method::GetPressure)
            .await
            .expect_err("mismatched action must not complete the call");
        assert!(matches!(err, RpcError::Timeout { .. }));
    }

    #[tokio::test]
    async fn dropping_the_stub_tears_down_its_reply_queue() {
        let broker = Broker::new("Test.Exchange");
        let _server = spawn_fixed_server(&broker, 1.0);

        let client = RpcClient::connect(&broker, "Observer", JsonCodec, quick_config())
            .expect("connect");
        let reply_queue = client.reply_queue().to_string();
        assert!(broker.has_queue(&reply_queue));

        drop(client);
        assert!(!broker.has_queue(&reply_queue));

        // Replies toward the torn-down queue drop silently.
        broker.publish(&reply_queue, Delivery::new(b"{}".to_vec()));
        assert_eq!(broker.unroutable(), 1);
    }
}
