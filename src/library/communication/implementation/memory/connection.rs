use super::super::super::event::{
    BrokerChannel, BrokerConnection, DeliveryStream, ExchangeDescriptor, QueueDescriptor,
    QueueFlags, RawPublisher,
};
use super::super::json::JsonPublisher;
use super::broker::{Envelope, QueueReceiver};
use super::{MemoryBroker, MemoryDelivery};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Connection to a [`MemoryBroker`]
///
/// Dropping the connection closes it.
pub struct MemoryConnection {
    id: u64,
    broker: MemoryBroker,
    closed: watch::Sender<bool>,
}

impl MemoryConnection {
    pub(super) fn new(id: u64, broker: MemoryBroker) -> Self {
        let (closed, _) = watch::channel(false);
        Self { id, broker, closed }
    }

    fn teardown(&self) {
        if self.broker.lock().close_connection(self.id) {
            debug!(connection = self.id, "Connection closed");
        }

        self.closed.send_replace(true);
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    type Channel = MemoryChannel;

    async fn open_channel(&self) -> Result<Self::Channel, BoxedError> {
        let id = self.broker.lock().open_channel(self.id)?;
        let (closed, _) = watch::channel(false);

        Ok(MemoryChannel {
            id,
            connection: self.id,
            broker: self.broker.clone(),
            closed,
            connection_closed: self.closed.subscribe(),
        })
    }

    async fn close(&self) -> EmptyResult {
        self.teardown();
        Ok(())
    }
}

/// Channel opened on a [`MemoryConnection`]
///
/// Dropping the channel closes it.
pub struct MemoryChannel {
    id: u64,
    connection: u64,
    broker: MemoryBroker,
    closed: watch::Sender<bool>,
    connection_closed: watch::Receiver<bool>,
}

impl MemoryChannel {
    fn deliveries(&self, queue: String, receiver: QueueReceiver) -> DeliveryStream<MemoryDelivery> {
        let cursor = Cursor {
            queue,
            receiver,
            broker: self.broker.clone(),
            channel_closed: self.closed.subscribe(),
            connection_closed: self.connection_closed.clone(),
        };

        stream::unfold(cursor, |mut cursor| async move {
            let envelope = cursor.next().await?;
            cursor.broker.lock().take_pending(&cursor.queue);

            let delivery = MemoryDelivery::new(cursor.broker.clone(), envelope);
            Some((Ok::<_, BoxedError>(delivery), cursor))
        })
        .boxed()
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.broker.lock().close_channel(self.id).ok();
        self.closed.send_replace(true);
    }
}

#[async_trait]
impl RawPublisher for MemoryChannel {
    async fn publish_raw(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> EmptyResult {
        let mut state = self.broker.lock();
        state.ensure_channel(self.id)?;

        let envelope = Envelope {
            routing_key: routing_key.to_owned(),
            payload: payload.to_vec(),
            content_type: content_type.to_owned(),
        };

        state.route(exchange, envelope)?;

        Ok(())
    }
}

impl JsonPublisher for MemoryChannel {}

#[async_trait]
impl BrokerChannel for MemoryChannel {
    type Delivery = MemoryDelivery;

    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> EmptyResult {
        let mut state = self.broker.lock();
        state.ensure_channel(self.id)?;
        state.declare_exchange(exchange)?;
        Ok(())
    }

    async fn declare_queue(
        &self,
        name: &str,
        flags: QueueFlags,
    ) -> Result<QueueDescriptor, BoxedError> {
        let mut state = self.broker.lock();
        state.ensure_channel(self.id)?;
        Ok(state.declare_queue(self.connection, name, flags)?)
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> EmptyResult {
        let mut state = self.broker.lock();
        state.ensure_channel(self.id)?;
        state.bind_queue(self.connection, queue, exchange, routing_key)?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream<Self::Delivery>, BoxedError> {
        let receiver = {
            let mut state = self.broker.lock();
            state.ensure_channel(self.id)?;
            state.attach_consumer(self.connection, queue)?
        };

        trace!(channel = self.id, queue, "Consumer attached");

        Ok(self.deliveries(queue.to_owned(), receiver))
    }

    async fn close(&self) -> EmptyResult {
        let result = self.broker.lock().close_channel(self.id);
        self.closed.send_replace(true);
        Ok(result?)
    }
}

/// Receiving side of a delivery stream
struct Cursor {
    queue: String,
    receiver: QueueReceiver,
    broker: MemoryBroker,
    channel_closed: watch::Receiver<bool>,
    connection_closed: watch::Receiver<bool>,
}

impl Cursor {
    /// Waits for the next message, returning `None` once the channel, the connection or the queue is gone
    async fn next(&mut self) -> Option<Envelope> {
        let Cursor {
            receiver,
            channel_closed,
            connection_closed,
            ..
        } = self;

        tokio::select! {
            biased;
            _ = channel_closed.wait_for(|closed| *closed) => None,
            _ = connection_closed.wait_for(|closed| *closed) => None,
            envelope = async { receiver.lock().await.recv().await } => envelope,
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.broker.lock().detach_consumer(&self.queue, &self.receiver);
    }
}
