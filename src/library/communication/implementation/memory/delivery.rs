use super::super::super::event::RawDelivery;
use super::super::json::JsonDelivery;
use super::broker::Envelope;
use super::{MemoryBroker, MemoryBrokerError};
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

static DELIVERY_TAG: AtomicU64 = AtomicU64::new(1);

/// Message received from a [`MemoryBroker`] queue
pub struct MemoryDelivery {
    tag: u64,
    envelope: Envelope,
    broker: MemoryBroker,
    acknowledged: bool,
}

impl MemoryDelivery {
    pub(super) fn new(broker: MemoryBroker, envelope: Envelope) -> Self {
        Self {
            tag: DELIVERY_TAG.fetch_add(1, Ordering::Relaxed),
            envelope,
            broker,
            acknowledged: false,
        }
    }

    /// Tag identifying the delivery
    pub fn delivery_tag(&self) -> u64 {
        self.tag
    }

    /// Content type the message has been published with
    pub fn content_type(&self) -> &str {
        &self.envelope.content_type
    }
}

#[async_trait]
impl RawDelivery for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.envelope.payload
    }

    fn routing_key(&self) -> &str {
        &self.envelope.routing_key
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        let duplicate = self.acknowledged;
        self.broker.lock().record_acknowledgement(duplicate);

        if duplicate {
            return Err(MemoryBrokerError::UnknownDeliveryTag(self.tag).into());
        }

        self.acknowledged = true;
        Ok(())
    }
}

impl JsonDelivery for MemoryDelivery {}
