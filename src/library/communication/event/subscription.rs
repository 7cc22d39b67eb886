use super::super::CommunicationError;
use super::{
    declare_and_bind, BrokerChannel, BrokerConnection, Consumer, Delivery, DeliveryStream,
    QueueBinding, QueueDescriptor, RawDelivery,
};
use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;
use std::any::type_name;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of a [`Subscription`]
///
/// ```text
/// Declaring -> Bound -> Consuming -> Closed
///     |          |
///     +----------+-----> Failed
/// ```
///
/// A [`Subscription`] handle only exists once deliveries are consumed, so
/// [`Subscription::state`] reports either `Consuming` or `Closed`. The setup states are
/// recorded in the `state` field of the log events emitted by [`subscribe_with`], and a
/// `Failed` setup additionally surfaces as the returned error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Queue is being declared and bound
    Declaring,
    /// Queue is bound, delivery stream is being opened
    Bound,
    /// Deliveries are being processed
    Consuming,
    /// Delivery stream has ended or the subscription has been cancelled
    Closed,
    /// Setup failed before any delivery could be consumed
    Failed,
}

/// Destination for deliveries whose payload could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterRoute {
    exchange: String,
    routing_key: String,
}

impl DeadLetterRoute {
    /// Creates a new instance from raw parts
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// Additional knobs for [`subscribe_with`]
#[derive(Debug, Clone, Default)]
pub struct SubscriptionOptions {
    dead_letter: Option<DeadLetterRoute>,
}

impl SubscriptionOptions {
    /// Forwards the raw payload of undecodable deliveries to the given route before acknowledging them.
    /// Without a route, such deliveries are discarded.
    pub fn with_dead_letter(mut self, route: DeadLetterRoute) -> Self {
        self.dead_letter = Some(route);
        self
    }
}

/// Handle to a running subscription
///
/// The subscription processes deliveries on a background task until the delivery stream
/// ends, which happens when the connection is closed. It does not reconnect. Dropping the
/// handle stops the task and closes the channel owned by the subscription.
pub struct Subscription {
    queue: QueueDescriptor,
    state: watch::Receiver<SubscriptionState>,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Queue the subscription consumes
    pub fn queue(&self) -> &QueueDescriptor {
        &self.queue
    }

    /// Current state of the subscription
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    /// Waits until the delivery stream has ended
    pub async fn closed(self) {
        let Subscription {
            queue,
            task,
            cancel: _cancel,
            ..
        } = self;

        if let Err(error) = task.await {
            error!(queue = queue.name(), ?error, "Subscription task terminated abnormally");
        }
    }

    /// Stops processing deliveries and waits for the subscription to release its channel
    ///
    /// A delivery that is currently being handled is processed and acknowledged first.
    pub async fn cancel(self) {
        let Subscription {
            queue,
            task,
            cancel,
            ..
        } = self;

        cancel.send(()).ok();

        if let Err(error) = task.await {
            error!(queue = queue.name(), ?error, "Subscription task terminated abnormally");
        }
    }
}

/// Subscribes a [`Consumer`] to a queue, see [`subscribe_with`]
pub async fn subscribe<C, M, H>(
    connection: &C,
    binding: QueueBinding,
    handler: H,
) -> Result<Subscription, CommunicationError>
where
    C: BrokerConnection,
    M: DeserializeOwned + Send + 'static,
    H: Consumer<M> + 'static,
{
    subscribe_with(connection, binding, handler, SubscriptionOptions::default()).await
}

/// Subscribes a [`Consumer`] to a queue
///
/// 1. Opens a dedicated channel, declares the queue and binds it
/// 2. Opens a delivery stream with manual acknowledgement
/// 3. Spawns a task which processes every delivery in order: it decodes the payload,
///    hands it to the consumer and acknowledges it once the consumer returned
///
/// Deliveries which can not be decoded are acknowledged without invoking the consumer
/// so that they are not redelivered forever. Errors returned by the consumer are logged.
///
/// Errors during the setup steps are returned and leave no channel behind.
pub async fn subscribe_with<C, M, H>(
    connection: &C,
    binding: QueueBinding,
    handler: H,
    options: SubscriptionOptions,
) -> Result<Subscription, CommunicationError>
where
    C: BrokerConnection,
    M: DeserializeOwned + Send + 'static,
    H: Consumer<M> + 'static,
{
    let message = type_name::<M>();

    debug!(
        queue = binding.queue(),
        message,
        state = ?SubscriptionState::Declaring,
        "Subscribing"
    );

    let (channel, queue) = match declare_and_bind(connection, &binding).await {
        Ok(declared) => declared,
        Err(error) => {
            warn!(
                queue = binding.queue(),
                state = ?SubscriptionState::Failed,
                ?error,
                "Subscription failed"
            );
            return Err(error);
        }
    };

    debug!(queue = queue.name(), state = ?SubscriptionState::Bound, "Queue bound");

    let deliveries = match channel.consume(queue.name()).await {
        Ok(deliveries) => deliveries,
        Err(source) => {
            if let Err(error) = channel.close().await {
                warn!(?error, "Failed to close channel after consume error");
            }

            let error = CommunicationError::Consume {
                queue: queue.name().to_owned(),
                source,
            };
            warn!(
                queue = queue.name(),
                state = ?SubscriptionState::Failed,
                ?error,
                "Subscription failed"
            );
            return Err(error);
        }
    };

    let (state, state_receiver) = watch::channel(SubscriptionState::Consuming);
    info!(queue = queue.name(), message, "Consuming");

    let (cancel, cancelled) = oneshot::channel();
    let worker = SubscriptionWorker {
        queue: queue.name().to_owned(),
        channel,
        handler,
        options,
        message: PhantomData,
    };

    let task = tokio::spawn(worker.run(deliveries, cancelled, state));

    Ok(Subscription {
        queue,
        state: state_receiver,
        cancel,
        task,
    })
}

struct SubscriptionWorker<Ch, H, M> {
    queue: String,
    channel: Ch,
    handler: H,
    options: SubscriptionOptions,
    message: PhantomData<fn(M)>,
}

impl<Ch, H, M> SubscriptionWorker<Ch, H, M>
where
    Ch: BrokerChannel,
    H: Consumer<M>,
    M: DeserializeOwned + Send + 'static,
{
    async fn run(
        self,
        mut deliveries: DeliveryStream<Ch::Delivery>,
        mut cancelled: oneshot::Receiver<()>,
        state: watch::Sender<SubscriptionState>,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut cancelled => {
                    debug!(queue = %self.queue, "Subscription cancelled");
                    break;
                }
                next = deliveries.next() => next,
            };

            match next {
                Some(Ok(delivery)) => self.process(delivery).await,
                Some(Err(error)) => {
                    warn!(queue = %self.queue, ?error, "Failed to receive delivery")
                }
                None => {
                    info!(queue = %self.queue, "Delivery stream closed");
                    break;
                }
            }
        }

        drop(deliveries);

        // The channel is already gone when the connection has been closed
        if let Err(error) = self.channel.close().await {
            debug!(queue = %self.queue, ?error, "Failed to close subscription channel");
        }

        state.send_replace(SubscriptionState::Closed);
    }

    async fn process(&self, mut delivery: Ch::Delivery) {
        match delivery.parse_payload::<M>() {
            Ok(message) => {
                let outcome = AssertUnwindSafe(self.handler.consume(message))
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(())) => trace!(queue = %self.queue, "Message consumed"),
                    Ok(Err(error)) => warn!(
                        queue = %self.queue,
                        message = type_name::<M>(),
                        ?error,
                        "Failed to consume message"
                    ),
                    Err(_) => error!(
                        queue = %self.queue,
                        message = type_name::<M>(),
                        "Consumer panicked while processing message"
                    ),
                }
            }
            Err(error) => {
                warn!(
                    queue = %self.queue,
                    routing_key = delivery.routing_key(),
                    ?error,
                    "Discarding delivery that could not be decoded"
                );

                if let Some(route) = &self.options.dead_letter {
                    self.forward(&delivery, route).await;
                }
            }
        }

        if let Err(error) = delivery.acknowledge().await {
            warn!(
                queue = %self.queue,
                error = ?CommunicationError::Acknowledge(error),
                "Failed to acknowledge delivery"
            );
        }
    }

    async fn forward(&self, delivery: &Ch::Delivery, route: &DeadLetterRoute) {
        let result = self
            .channel
            .publish_raw(
                &route.exchange,
                &route.routing_key,
                delivery.payload(),
                DEAD_LETTER_CONTENT_TYPE,
            )
            .await;

        if let Err(error) = result {
            warn!(
                queue = %self.queue,
                exchange = %route.exchange,
                ?error,
                "Failed to forward undecodable delivery to dead letter route"
            );
        }
    }
}

const DEAD_LETTER_CONTENT_TYPE: &str = "application/octet-stream";
