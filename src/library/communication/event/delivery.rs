use super::super::CommunicationError;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Message received from a queue providing a raw payload
#[async_trait]
pub trait RawDelivery {
    /// Payload of the message
    fn payload(&self) -> &[u8];

    /// Routing key the message has been published with
    fn routing_key(&self) -> &str;

    /// Acknowledge the message as processed, removing it from the queue
    async fn acknowledge(&mut self) -> EmptyResult;
}

/// Useful functions for [`RawDelivery`] implementations with default implementations
pub trait Delivery: RawDelivery {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<T>(&self) -> Result<T, CommunicationError>
    where
        T: DeserializeOwned;
}
