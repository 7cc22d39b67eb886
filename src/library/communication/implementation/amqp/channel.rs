use super::super::super::event::{
    BrokerChannel, DeliveryStream, ExchangeDescriptor, ExchangeKind, QueueDescriptor, QueueFlags,
    RawPublisher,
};
use super::super::json::JsonPublisher;
use super::{AmqpDelivery, REPLY_SUCCESS, REPLY_TEXT};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};

/// Channel opened on an [`AmqpConnection`](super::AmqpConnection)
pub struct AmqpChannel {
    inner: Channel,
}

impl AmqpChannel {
    pub(super) fn new(inner: Channel) -> Self {
        Self { inner }
    }
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

fn declare_options(flags: QueueFlags) -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: flags.durable(),
        exclusive: flags.exclusive(),
        auto_delete: flags.auto_delete(),
        ..Default::default()
    }
}

#[async_trait]
impl RawPublisher for AmqpChannel {
    async fn publish_raw(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> EmptyResult {
        let options = BasicPublishOptions {
            mandatory: false,
            immediate: false,
        };
        let properties = BasicProperties::default().with_content_type(content_type.into());

        self.inner
            .basic_publish(exchange, routing_key, options, payload, properties)
            .await?
            .await?;

        Ok(())
    }
}

impl JsonPublisher for AmqpChannel {}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    type Delivery = AmqpDelivery;

    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> EmptyResult {
        let options = ExchangeDeclareOptions {
            durable: true,
            ..Default::default()
        };

        self.inner
            .exchange_declare(
                exchange.name(),
                exchange.kind().into(),
                options,
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn declare_queue(
        &self,
        name: &str,
        flags: QueueFlags,
    ) -> Result<QueueDescriptor, BoxedError> {
        let queue = self
            .inner
            .queue_declare(name, declare_options(flags), FieldTable::default())
            .await?;

        Ok(QueueDescriptor::new(
            queue.name().as_str().to_owned(),
            flags,
            queue.message_count(),
            queue.consumer_count(),
        ))
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> EmptyResult {
        self.inner
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream<Self::Delivery>, BoxedError> {
        // Manual acknowledgement, non-exclusive, broker generated consumer tag
        let options = BasicConsumeOptions {
            no_ack: false,
            exclusive: false,
            no_local: false,
            nowait: false,
        };

        let consumer = self
            .inner
            .basic_consume(queue, "", options, FieldTable::default())
            .await?;

        let deliveries = consumer.map(|delivery| {
            delivery
                .map(AmqpDelivery::from)
                .map_err(|e| -> BoxedError { e.into() })
        });

        Ok(deliveries.boxed())
    }

    async fn close(&self) -> EmptyResult {
        self.inner.close(REPLY_SUCCESS, REPLY_TEXT).await?;
        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::library::communication::event::QueueDurability;
    use pretty_assertions::assert_eq;

    #[test]
    fn declare_durable_queues_as_shared() {
        let options = declare_options(QueueDurability::Durable.flags());

        assert_eq!(
            (options.durable, options.exclusive, options.auto_delete),
            (true, false, false)
        );
        assert!(!options.passive);
    }

    #[test]
    fn declare_transient_queues_as_private() {
        let options = declare_options(QueueDurability::Transient.flags());

        assert_eq!(
            (options.durable, options.exclusive, options.auto_delete),
            (false, true, true)
        );
    }
}
