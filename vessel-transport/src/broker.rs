//! In-process broker model.
//!
//! One [`Broker`] stands in for a direct-routing exchange together with the
//! queues bound to it. Queues are unbounded FIFO channels; publishing routes
//! a [`Delivery`] to every queue bound under the routing key, cloning the
//! delivery per queue.
//!
//! The model keeps the two broker behaviors the protocol depends on:
//! at-least-once, in-order delivery to a bound, active queue, and *silent*
//! dropping of anything addressed to an unbound key or a torn-down queue —
//! a lost reply is the caller's timeout to discover, never a publish error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::delivery::Delivery;
use crate::error::TransportError;
use crate::subscription::Subscription;

/// Declaration parameters for one queue.
#[derive(Debug, Clone)]
pub struct QueueSpec {
    /// Queue name, also the routing key it is conventionally bound under.
    pub name: String,
    /// Survives broker restarts in a real deployment; informational here.
    pub durable: bool,
    /// Owned by a single client instance and torn down with it.
    pub exclusive: bool,
}

impl QueueSpec {
    /// A durable, shared queue (the server queue).
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            exclusive: false,
        }
    }

    /// An exclusive, non-durable queue (a client reply queue).
    pub fn exclusive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: false,
            exclusive: true,
        }
    }
}

/// Delivery counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Deliveries routed into the queue.
    pub delivered: u64,
    /// Deliveries dropped because the consumer side was gone.
    pub dropped: u64,
}

struct QueueEntry {
    tx: mpsc::UnboundedSender<Delivery>,
    /// Taken by the first (only) subscriber.
    rx: Option<mpsc::UnboundedReceiver<Delivery>>,
    stats: QueueStats,
}

struct BrokerInner {
    queues: HashMap<String, QueueEntry>,
    /// Routing key -> names of bound queues.
    bindings: HashMap<String, Vec<String>>,
    unroutable: u64,
}

/// Handle to the in-process broker.
///
/// Cheap to clone; all clones address the same exchange and queues.
#[derive(Clone)]
pub struct Broker {
    exchange: Arc<str>,
    inner: Arc<Mutex<BrokerInner>>,
}

impl Broker {
    /// Create a broker modeling one direct-routing exchange.
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: Arc::from(exchange.into()),
            inner: Arc::new(Mutex::new(BrokerInner {
                queues: HashMap::new(),
                bindings: HashMap::new(),
                unroutable: 0,
            })),
        }
    }

    /// The exchange name this broker models.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Declare a queue.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueExists`] if the name is already taken.
    pub fn declare_queue(&self, spec: QueueSpec) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.queues.contains_key(&spec.name) {
            return Err(TransportError::QueueExists {
                name: spec.name.clone(),
            });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(
            exchange = %self.exchange,
            queue = %spec.name,
            durable = spec.durable,
            exclusive = spec.exclusive,
            "queue declared"
        );
        inner.queues.insert(
            spec.name,
            QueueEntry {
                tx,
                rx: Some(rx),
                stats: QueueStats::default(),
            },
        );
        Ok(())
    }

    /// Bind a queue to the exchange under a routing key.
    ///
    /// A key may bind several queues; each receives its own copy of every
    /// matching delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueNotFound`] if the queue does not exist.
    pub fn bind(&self, queue: &str, routing_key: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if !inner.queues.contains_key(queue) {
            return Err(TransportError::QueueNotFound {
                name: queue.to_string(),
            });
        }
        let bound = inner.bindings.entry(routing_key.to_string()).or_default();
        if !bound.iter().any(|name| name == queue) {
            bound.push(queue.to_string());
        }
        Ok(())
    }

    /// Publish a delivery under a routing key.
    ///
    /// Correlation metadata is preserved unchanged. Unbound keys and
    /// torn-down destinations are a silent drop, counted and traced but
    /// never an error.
    pub fn publish(&self, routing_key: &str, delivery: Delivery) {
        let mut inner = self.lock();
        let targets = match inner.bindings.get(routing_key) {
            Some(bound) if !bound.is_empty() => bound.clone(),
            _ => {
                inner.unroutable += 1;
                debug!(
                    exchange = %self.exchange,
                    routing_key,
                    "dropping delivery to unbound routing key"
                );
                return;
            }
        };
        for name in targets {
            if let Some(entry) = inner.queues.get_mut(&name) {
                if entry.tx.send(delivery.clone()).is_ok() {
                    entry.stats.delivered += 1;
                } else {
                    entry.stats.dropped += 1;
                    debug!(queue = %name, "dropping delivery to detached consumer");
                }
            }
        }
    }

    /// Attach a consumer to a queue.
    ///
    /// The handler runs on a dedicated task, one delivery at a time in
    /// publish order; calling this requires a running tokio runtime.
    /// Dropping the returned [`Subscription`] detaches the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueNotFound`] for unknown queues and
    /// [`TransportError::AlreadySubscribed`] if the queue's consumer slot
    /// is taken.
    pub fn subscribe<F>(&self, queue: &str, handler: F) -> Result<Subscription, TransportError>
    where
        F: FnMut(Delivery) + Send + 'static,
    {
        let mut rx = {
            let mut inner = self.lock();
            let entry = inner
                .queues
                .get_mut(queue)
                .ok_or_else(|| TransportError::QueueNotFound {
                    name: queue.to_string(),
                })?;
            entry
                .rx
                .take()
                .ok_or_else(|| TransportError::AlreadySubscribed {
                    name: queue.to_string(),
                })?
        };
        let name = queue.to_string();
        let task = tokio::spawn(async move {
            let mut handler = handler;
            while let Some(delivery) = rx.recv().await {
                handler(delivery);
            }
            debug!(queue = %name, "consumer finished; queue torn down");
        });
        Ok(Subscription::new(queue.to_string(), task))
    }

    /// Tear a queue down.
    ///
    /// Bindings to the queue are removed; deliveries already queued are
    /// still handed to an attached consumer, and later publishes toward the
    /// queue drop silently.
    pub fn delete_queue(&self, name: &str) {
        let mut inner = self.lock();
        if inner.queues.remove(name).is_some() {
            debug!(exchange = %self.exchange, queue = %name, "queue deleted");
        }
        for bound in inner.bindings.values_mut() {
            bound.retain(|queue| queue != name);
        }
    }

    /// Delivery counters for a queue, if it exists.
    pub fn queue_stats(&self, name: &str) -> Option<QueueStats> {
        self.lock().queues.get(name).map(|entry| entry.stats)
    }

    /// Deliveries published to keys with no bound queue.
    pub fn unroutable(&self) -> u64 {
        self.lock().unroutable
    }

    /// Whether a queue is currently declared.
    pub fn has_queue(&self, name: &str) -> bool {
        self.lock().queues.contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerInner> {
        self.inner.lock().expect("broker state lock poisoned")
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Broker")
            .field("exchange", &self.exchange)
            .field("queues", &inner.queues.len())
            .field("bindings", &inner.bindings.len())
            .finish()
    }
}
