use crate::library::BoxedError;
use thiserror::Error;

/// Errors raised while talking to a message broker
///
/// Setup errors (everything up to and including [`Consume`](CommunicationError::Consume)) are
/// returned to whoever attempted to publish or subscribe. Per-message errors that occur inside
/// a running subscription never leave its task and are only logged.
#[derive(Error, Debug)]
pub enum CommunicationError {
    /// Connection to the broker could not be established or was lost
    #[error("unable to connect to broker")]
    Connection(#[source] BoxedError),

    /// Channel could not be opened on the connection
    #[error("failed to open a channel")]
    ChannelOpen(#[source] BoxedError),

    /// Exchange could not be declared
    #[error("failed to declare exchange {exchange}")]
    ExchangeDeclare {
        /// Name of the exchange
        exchange: String,
        /// Error reported by the broker
        #[source]
        source: BoxedError,
    },

    /// Queue could not be declared
    #[error("failed to declare queue {queue}")]
    QueueDeclare {
        /// Name of the queue
        queue: String,
        /// Error reported by the broker
        #[source]
        source: BoxedError,
    },

    /// Queue could not be bound to an exchange
    #[error("failed to bind queue {queue} to exchange {exchange} with key {routing_key}")]
    QueueBind {
        /// Name of the queue
        queue: String,
        /// Name of the exchange
        exchange: String,
        /// Routing key or pattern of the binding
        routing_key: String,
        /// Error reported by the broker
        #[source]
        source: BoxedError,
    },

    /// Delivery stream could not be opened on a queue
    #[error("failed to consume from queue {queue}")]
    Consume {
        /// Name of the queue
        queue: String,
        /// Error reported by the broker
        #[source]
        source: BoxedError,
    },

    /// Value could not be represented in the wire format
    #[error("failed to serialize {payload}")]
    Serialization {
        /// Name of the type that was serialized
        payload: &'static str,
        /// Error reported by the codec
        #[source]
        source: BoxedError,
    },

    /// Wire data is malformed or does not match the expected shape
    #[error("failed to deserialize {payload}")]
    Deserialization {
        /// Name of the type that was expected
        payload: &'static str,
        /// Error reported by the codec
        #[source]
        source: BoxedError,
    },

    /// Broker refused or failed to accept a published message
    #[error("failed to publish message to exchange {exchange} with key {routing_key}")]
    Publish {
        /// Name of the exchange
        exchange: String,
        /// Routing key of the message
        routing_key: String,
        /// Error reported by the broker
        #[source]
        source: BoxedError,
    },

    /// Delivery could not be acknowledged
    #[error("failed to acknowledge delivery")]
    Acknowledge(#[source] BoxedError),
}
