//! Game authority controlling the playing state and collecting logs
//!
//! The authority is the only party declaring exchanges. It broadcasts pause and resume
//! announcements on the direct exchange and drains the durable game log queue, which
//! keeps accumulating entries while no authority is running.

use crate::domain::event::{GameLog, PlayingState};
use crate::domain::routing::{exchanges, game_log_binding, EXCHANGE_PERIL_DIRECT, PAUSE_KEY};
use crate::library::communication::event::{
    declare_exchange, open_channel, subscribe, BrokerChannel, BrokerConnection, Consumer,
    Subscription,
};
use crate::library::communication::CommunicationError;
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Authority holding a dedicated channel for declarations and broadcasts
pub struct Authority<Ch> {
    channel: Ch,
}

impl<Ch> Authority<Ch>
where
    Ch: BrokerChannel,
{
    /// Opens a channel and makes sure that all exchanges exist
    pub async fn start<C>(connection: &C) -> Result<Self, CommunicationError>
    where
        C: BrokerConnection<Channel = Ch>,
    {
        let channel = open_channel(connection).await?;

        for exchange in exchanges() {
            if let Err(error) = declare_exchange(&channel, &exchange).await {
                if let Err(close_error) = channel.close().await {
                    debug!(error = ?close_error, "Failed to close channel after declaration error");
                }

                return Err(error);
            }
        }

        info!("Exchanges declared");

        Ok(Self { channel })
    }

    /// Forbids all participants from moving
    pub async fn pause(&self) -> Result<(), CommunicationError> {
        self.broadcast(PlayingState::paused()).await
    }

    /// Allows all participants to move again
    pub async fn resume(&self) -> Result<(), CommunicationError> {
        self.broadcast(PlayingState::resumed()).await
    }

    #[instrument(err, skip(self))]
    async fn broadcast(&self, state: PlayingState) -> Result<(), CommunicationError> {
        self.channel
            .publish(EXCHANGE_PERIL_DIRECT, PAUSE_KEY, &state)
            .await?;

        info!(paused = state.paused, "Playing state announced");

        Ok(())
    }

    /// Consumes the durable game log queue, handing every entry to the given consumer
    pub async fn collect_game_logs<C, H>(
        &self,
        connection: &C,
        handler: H,
    ) -> Result<Subscription, CommunicationError>
    where
        C: BrokerConnection,
        H: Consumer<GameLog> + 'static,
    {
        subscribe(connection, game_log_binding(), handler).await
    }

    /// Releases the channel of the authority
    pub async fn stop(self) {
        if let Err(error) = self.channel.close().await {
            debug!(?error, "Failed to close authority channel");
        }
    }
}

/// Writes game log entries to the tracing output
#[derive(Clone, Default)]
pub struct GameLogWriter {
    written: Arc<AtomicUsize>,
}

impl GameLogWriter {
    /// Number of entries written so far
    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Consumer<GameLog> for GameLogWriter {
    async fn consume(&self, entry: GameLog) -> EmptyResult {
        info!(
            timestamp = %entry.timestamp,
            participant = %entry.participant,
            "{}",
            entry.message
        );

        self.written.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::routing::{EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG};
    use crate::library::communication::event::{ExchangeDescriptor, ExchangeKind, QueueDurability};
    use crate::library::communication::implementation::memory::MemoryBroker;
    use crate::module::participant::Participant;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::timeout;

    const PATIENCE: Duration = Duration::from_secs(5);

    async fn eventually(condition: impl Fn() -> bool) {
        timeout(PATIENCE, async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition was not met in time");
    }

    #[tokio::test]
    async fn declare_exchanges_on_start() {
        let broker = MemoryBroker::default();
        let connection = broker.connect();

        let authority = Authority::start(&connection).await.unwrap();

        assert_eq!(broker.exchange_kind("peril_direct"), Some(ExchangeKind::Direct));
        assert_eq!(broker.exchange_kind("peril_topic"), Some(ExchangeKind::Topic));

        authority.stop().await;
        assert_eq!(broker.open_channels(), 0);
    }

    #[tokio::test]
    async fn release_channel_when_exchanges_conflict() {
        let broker = MemoryBroker::default();
        broker.provision_exchange(&ExchangeDescriptor::new("peril_direct", ExchangeKind::Topic));
        let connection = broker.connect();

        let result = Authority::start(&connection).await;

        assert!(matches!(result, Err(CommunicationError::ExchangeDeclare { .. })));
        assert_eq!(broker.open_channels(), 0);
    }

    #[tokio::test]
    async fn broadcast_playing_state_to_all_participants() {
        let broker = MemoryBroker::default();
        let connection = broker.connect();
        let authority = Authority::start(&connection).await.unwrap();

        let alice = Participant::new("alice");
        let bob = Participant::new("bob");
        let _alice = alice.join(&connection).await.unwrap();
        let _bob = bob.join(&connection).await.unwrap();

        authority.pause().await.unwrap();
        eventually(|| alice.is_paused() && bob.is_paused()).await;

        authority.resume().await.unwrap();
        eventually(|| !alice.is_paused() && !bob.is_paused()).await;
    }

    #[tokio::test]
    async fn keep_game_logs_until_collected() {
        let broker = MemoryBroker::default();
        let connection = broker.connect();
        let authority = Authority::start(&connection).await.unwrap();

        // Logs written before anyone collects them only survive in an existing queue
        let publisher = open_channel(&connection).await.unwrap();
        publisher
            .declare_queue(GAME_LOG_SLUG, QueueDurability::Durable.flags())
            .await
            .unwrap();
        publisher
            .bind_queue(GAME_LOG_SLUG, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG)
            .await
            .unwrap();

        let alice = Participant::new("alice");
        alice.log(&publisher, "alice joined the game").await.unwrap();
        alice.log(&publisher, "alice moved to europe").await.unwrap();
        assert_eq!(broker.pending(GAME_LOG_SLUG), 2);

        let writer = GameLogWriter::default();
        let subscription = authority
            .collect_game_logs(&connection, writer.clone())
            .await
            .unwrap();

        assert_eq!(subscription.queue().flags(), QueueDurability::Durable.flags());
        eventually(|| writer.written() == 2).await;
    }

    #[tokio::test]
    async fn keep_durable_log_queue_after_disconnect() {
        let broker = MemoryBroker::default();
        let connection = broker.connect();
        let authority = Authority::start(&connection).await.unwrap();

        let subscription = authority
            .collect_game_logs(&connection, GameLogWriter::default())
            .await
            .unwrap();
        connection.close().await.unwrap();
        timeout(PATIENCE, subscription.closed()).await.unwrap();

        assert_eq!(
            broker.queue_flags(GAME_LOG_SLUG),
            Some(QueueDurability::Durable.flags())
        );
    }
}
