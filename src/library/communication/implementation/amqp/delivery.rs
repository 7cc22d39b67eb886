use super::super::super::event::RawDelivery;
use super::super::json::JsonDelivery;
use crate::library::EmptyResult;
use async_trait::async_trait;
use lapin::message::Delivery;
use lapin::options::BasicAckOptions;

/// Message received through an [`AmqpChannel`](super::AmqpChannel)
pub struct AmqpDelivery {
    inner: Delivery,
}

impl AmqpDelivery {
    /// Content type the message has been published with, if any
    pub fn content_type(&self) -> Option<&str> {
        self.inner
            .properties
            .content_type()
            .as_ref()
            .map(|content_type| content_type.as_str())
    }

    /// Whether the broker delivered this message before without it being acknowledged
    pub fn redelivered(&self) -> bool {
        self.inner.redelivered
    }
}

impl From<Delivery> for AmqpDelivery {
    fn from(inner: Delivery) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RawDelivery for AmqpDelivery {
    fn payload(&self) -> &[u8] {
        &self.inner.data
    }

    fn routing_key(&self) -> &str {
        self.inner.routing_key.as_str()
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        self.inner.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }
}

impl JsonDelivery for AmqpDelivery {}
