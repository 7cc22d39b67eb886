use super::{Delivery, ExchangeDescriptor, Publisher, QueueDescriptor, QueueFlags, RawPublisher};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of deliveries received from a queue
pub type DeliveryStream<D> = BoxStream<'static, Result<D, BoxedError>>;

/// Process-wide connection to a broker
///
/// The connection is the only resource shared between publishers and subscriptions.
/// Each of them opens its own [`BrokerChannel`] on top of it.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Type of channel opened on this connection
    type Channel: BrokerChannel + 'static;

    /// Opens a new channel which is exclusively owned by the caller
    async fn open_channel(&self) -> Result<Self::Channel, BoxedError>;

    /// Closes the connection, tearing down all channels opened on it
    async fn close(&self) -> EmptyResult;
}

/// Lightweight session multiplexed over a [`BrokerConnection`]
///
/// Channels are not meant to be used concurrently from multiple tasks.
#[async_trait]
pub trait BrokerChannel: RawPublisher + Publisher + Send + Sync {
    /// Type of deliveries received through this channel
    type Delivery: Delivery + Send + Sync + 'static;

    /// Declares an exchange, succeeding if it already exists with the same kind
    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> EmptyResult;

    /// Declares a queue, succeeding if it already exists with the same flags
    ///
    /// An empty name lets the broker generate a unique one.
    async fn declare_queue(&self, name: &str, flags: QueueFlags)
        -> Result<QueueDescriptor, BoxedError>;

    /// Binds a queue to an exchange, succeeding if the binding already exists
    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> EmptyResult;

    /// Starts consuming a queue with manual acknowledgement as a non-exclusive consumer
    async fn consume(&self, queue: &str) -> Result<DeliveryStream<Self::Delivery>, BoxedError>;

    /// Closes the channel, ending all delivery streams opened on it
    async fn close(&self) -> EmptyResult;
}
