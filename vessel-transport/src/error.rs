//! Error types for the transport layer.

use std::time::Duration;

use vessel_core::{CodecError, DecodeError};

/// Errors raised by broker operations.
///
/// These are fatal to the component that hits them; the broker performs no
/// in-place recovery, and process-level supervision is expected to rebuild
/// the affected side from scratch.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A queue with this name has already been declared.
    #[error("queue already declared: {name}")]
    QueueExists {
        /// The conflicting queue name.
        name: String,
    },

    /// No queue with this name exists.
    #[error("queue not found: {name}")]
    QueueNotFound {
        /// The missing queue name.
        name: String,
    },

    /// The queue already has an active consumer.
    #[error("queue already has a consumer: {name}")]
    AlreadySubscribed {
        /// The queue with the existing consumer.
        name: String,
    },
}

/// Errors surfaced to a caller of the RPC stub.
///
/// A timeout is a transport-level failure, deliberately distinct from a
/// semantic rejection (which arrives as an ordinary result payload).
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// No matching reply arrived within the configured bound.
    #[error("no reply within {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The reply channel closed before a response was observed.
    #[error("reply subscription closed before a response arrived")]
    ReplyDropped,

    /// The request payload or envelope could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The reply envelope could not be decoded into the expected type.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The underlying broker operation failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
