//! Broker topology constants.
//!
//! Fixed, well-known names take the place of service discovery: every
//! participant publishes and binds against these strings.

use crate::correlation::CorrelationId;

/// The direct-routing exchange all traffic flows through.
pub const EXCHANGE: &str = "GasPressure.Exchange";

/// The durable, shared server queue.
pub const SERVICE_QUEUE: &str = "GasPressure.Service";

/// Routing key the server queue is bound under (equal to its name).
pub const SERVICE_ROUTING_KEY: &str = SERVICE_QUEUE;

/// Build the exclusive reply-queue name for one client instance.
///
/// The format is `GasPressure.<Role>Client_<unique-id>`; each reply queue is
/// bound under a routing key equal to its own name.
pub fn reply_queue_name(role: &str, unique: CorrelationId) -> String {
    format!("GasPressure.{role}Client_{unique}")
}
