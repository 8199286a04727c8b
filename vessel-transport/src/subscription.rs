//! Subscription handles.

use tokio::task::JoinHandle;

/// Handle to an active queue consumer.
///
/// Owns the consumer task; dropping the handle (or calling
/// [`cancel`](Subscription::cancel)) detaches the consumer, after which
/// deliveries still routed to the queue are dropped by the broker.
#[derive(Debug)]
pub struct Subscription {
    queue: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(queue: String, task: JoinHandle<()>) -> Self {
        Self { queue, task }
    }

    /// The queue this subscription consumes.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Whether the consumer task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Detach the consumer.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
