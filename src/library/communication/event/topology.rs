use super::super::CommunicationError;
use super::{BrokerChannel, BrokerConnection, ExchangeDescriptor, QueueBinding, QueueDescriptor};
use tracing::{debug, instrument, warn};

/// Opens a new channel on the connection
pub async fn open_channel<C>(connection: &C) -> Result<C::Channel, CommunicationError>
where
    C: BrokerConnection,
{
    connection
        .open_channel()
        .await
        .map_err(CommunicationError::ChannelOpen)
}

/// Declares an exchange on the given channel
///
/// Exchanges are usually provisioned once by whoever operates the broker.
/// Declaring an already existing exchange of the same kind is a no-op.
#[instrument(err, skip(channel, exchange), fields(name = exchange.name(), kind = %exchange.kind()))]
pub async fn declare_exchange<Ch>(
    channel: &Ch,
    exchange: &ExchangeDescriptor,
) -> Result<(), CommunicationError>
where
    Ch: BrokerChannel,
{
    channel
        .declare_exchange(exchange)
        .await
        .map_err(|source| CommunicationError::ExchangeDeclare {
            exchange: exchange.name().to_owned(),
            source,
        })
}

/// Opens a channel, declares a queue and binds it to an exchange
///
/// The queue is declared with the flags derived from the [durability](super::QueueDurability)
/// of the binding. Calling this repeatedly with the same binding is safe as the broker treats
/// identical declarations and bindings as no-ops.
///
/// When declaring or binding fails, the channel is closed before the error is returned.
#[instrument(err, skip(connection, binding), fields(queue = binding.queue(), exchange = binding.exchange(), key = binding.routing_key()))]
pub async fn declare_and_bind<C>(
    connection: &C,
    binding: &QueueBinding,
) -> Result<(C::Channel, QueueDescriptor), CommunicationError>
where
    C: BrokerConnection,
{
    let channel = open_channel(connection).await?;
    let flags = binding.durability().flags();

    let queue = match channel.declare_queue(binding.queue(), flags).await {
        Ok(queue) => queue,
        Err(source) => {
            release(&channel).await;
            return Err(CommunicationError::QueueDeclare {
                queue: binding.queue().to_owned(),
                source,
            });
        }
    };

    if let Err(source) = channel
        .bind_queue(queue.name(), binding.exchange(), binding.routing_key())
        .await
    {
        release(&channel).await;
        return Err(CommunicationError::QueueBind {
            queue: queue.name().to_owned(),
            exchange: binding.exchange().to_owned(),
            routing_key: binding.routing_key().to_owned(),
            source,
        });
    }

    debug!(queue = queue.name(), ?flags, "Queue declared and bound");

    Ok((channel, queue))
}

async fn release<Ch: BrokerChannel>(channel: &Ch) {
    if let Err(error) = channel.close().await {
        warn!(?error, "Failed to close channel after topology error");
    }
}
