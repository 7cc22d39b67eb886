use super::super::CommunicationError;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::Serialize;

/// Structure which allows publishing of serialized data to an exchange
#[async_trait]
pub trait RawPublisher {
    /// Sends an opaque payload to an exchange under an exact routing key
    ///
    /// Messages are neither mandatory nor immediate, so the broker silently drops
    /// them when no queue is bound under the routing key.
    async fn publish_raw(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> EmptyResult;
}

/// Publisher for typed values
///
/// Implementations are not synchronized internally, callers sharing one
/// publisher between tasks have to serialize their calls.
#[async_trait]
pub trait Publisher {
    /// Encodes the value and publishes it to an exchange under an exact routing key
    ///
    /// Failures are returned as-is and never retried.
    async fn publish<T: Serialize + Send + Sync>(
        &self,
        exchange: &str,
        routing_key: &str,
        value: &T,
    ) -> Result<(), CommunicationError>;
}
