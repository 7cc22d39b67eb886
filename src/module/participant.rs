//! Player taking part in a game
//!
//! A participant owns two transient mailboxes: one receiving the army moves of every
//! participant and one receiving pause broadcasts from the authority. Both vanish
//! together with the connection the participant joined on.

use crate::domain::event::{ArmyMove, GameLog, PlayingState, Unit};
use crate::domain::routing::{
    army_moves_binding, pause_binding, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG,
};
use crate::library::communication::event::{
    subscribe, BrokerConnection, Consumer, Publisher, Subscription,
};
use crate::library::communication::CommunicationError;
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Reasons why a participant could not act
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// Authority paused the game
    #[error("the game is paused, units can not be moved")]
    Paused,
    /// Move did not contain any units
    #[error("at least one unit has to be moved")]
    NoUnits,
    /// Broker interaction failed
    #[error(transparent)]
    Communication(#[from] CommunicationError),
}

#[derive(Default)]
struct ParticipantState {
    paused: AtomicBool,
    observed: Mutex<Vec<ArmyMove>>,
}

/// Player identified by a unique name
#[derive(Clone)]
pub struct Participant {
    name: String,
    state: Arc<ParticipantState>,
}

impl Participant {
    /// Creates a new participant who has not joined a game yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(ParticipantState::default()),
        }
    }

    /// Name of the participant
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the last broadcast received from the authority paused the game
    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    /// Moves of other participants received so far, in the order they arrived
    pub fn observed_moves(&self) -> Vec<ArmyMove> {
        self.state
            .observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribes to army moves and pause broadcasts
    ///
    /// If the second subscription fails, the first one is cancelled again.
    pub async fn join<C>(&self, connection: &C) -> Result<Membership, CommunicationError>
    where
        C: BrokerConnection,
    {
        let observer = MoveObserver {
            participant: self.name.clone(),
            state: self.state.clone(),
        };
        let moves = subscribe(connection, army_moves_binding(&self.name), observer).await?;

        let listener = PauseListener {
            participant: self.name.clone(),
            state: self.state.clone(),
        };
        let pause = match subscribe(connection, pause_binding(&self.name), listener).await {
            Ok(subscription) => subscription,
            Err(error) => {
                moves.cancel().await;
                return Err(error);
            }
        };

        info!(participant = %self.name, "Joined game");

        Ok(Membership { moves, pause })
    }

    /// Moves units to a destination and announces the move to everyone
    #[instrument(err, skip(self, publisher, units), fields(participant = %self.name, units = units.len()))]
    pub async fn move_units<P>(
        &self,
        publisher: &P,
        units: Vec<Unit>,
        destination: &str,
    ) -> Result<ArmyMove, ParticipantError>
    where
        P: Publisher + Sync,
    {
        if self.is_paused() {
            return Err(ParticipantError::Paused);
        }

        if units.is_empty() {
            return Err(ParticipantError::NoUnits);
        }

        let movement = ArmyMove {
            participant: self.name.clone(),
            units,
            destination: destination.to_owned(),
        };

        publisher
            .publish(EXCHANGE_PERIL_TOPIC, &movement.routing_key(), &movement)
            .await?;

        info!(destination, power = movement.power(), "Units moved");

        Ok(movement)
    }

    /// Writes an entry to the shared game log
    pub async fn log<P>(&self, publisher: &P, message: &str) -> Result<(), CommunicationError>
    where
        P: Publisher + Sync,
    {
        let entry = GameLog::new(self.name.as_str(), message);

        publisher
            .publish(EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG, &entry)
            .await
    }
}

/// Subscriptions held by a participant that joined a game
pub struct Membership {
    moves: Subscription,
    pause: Subscription,
}

impl Membership {
    /// Subscription receiving army moves
    pub fn moves(&self) -> &Subscription {
        &self.moves
    }

    /// Subscription receiving pause broadcasts
    pub fn pause(&self) -> &Subscription {
        &self.pause
    }

    /// Waits until both subscriptions have ended, usually because the connection closed
    pub async fn closed(self) {
        futures::join!(self.moves.closed(), self.pause.closed());
    }

    /// Stops receiving anything and releases the channels of both subscriptions
    pub async fn leave(self) {
        futures::join!(self.moves.cancel(), self.pause.cancel());
    }
}

struct MoveObserver {
    participant: String,
    state: Arc<ParticipantState>,
}

#[async_trait]
impl Consumer<ArmyMove> for MoveObserver {
    async fn consume(&self, movement: ArmyMove) -> EmptyResult {
        if movement.participant == self.participant {
            debug!(destination = %movement.destination, "Own move echoed back");
            return Ok(());
        }

        info!(
            participant = %self.participant,
            mover = %movement.participant,
            destination = %movement.destination,
            power = movement.power(),
            "Observed army move"
        );

        self.state
            .observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(movement);

        Ok(())
    }
}

struct PauseListener {
    participant: String,
    state: Arc<ParticipantState>,
}

#[async_trait]
impl Consumer<PlayingState> for PauseListener {
    async fn consume(&self, state: PlayingState) -> EmptyResult {
        let previous = self.state.paused.swap(state.paused, Ordering::SeqCst);

        if previous != state.paused {
            info!(participant = %self.participant, paused = state.paused, "Playing state changed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::event::UnitRank;
    use crate::domain::routing::{exchanges, EXCHANGE_PERIL_DIRECT, PAUSE_KEY};
    use crate::library::communication::event::{open_channel, SubscriptionState};
    use crate::library::communication::implementation::memory::MemoryBroker;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::timeout;

    const PATIENCE: Duration = Duration::from_secs(5);

    fn broker() -> MemoryBroker {
        let broker = MemoryBroker::default();
        for exchange in exchanges() {
            broker.provision_exchange(&exchange);
        }
        broker
    }

    fn infantry() -> Vec<Unit> {
        vec![Unit {
            id: 1,
            rank: UnitRank::Infantry,
        }]
    }

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
    async fn observe_moves_of_others_only() {
        let broker = broker();
        let connection = broker.connect();
        let alice = Participant::new("alice");
        let bob = Participant::new("bob");

        let _alice = alice.join(&connection).await.unwrap();
        let _bob = bob.join(&connection).await.unwrap();

        let publisher = open_channel(&connection).await.unwrap();
        let movement = alice
            .move_units(&publisher, infantry(), "europe")
            .await
            .unwrap();

        eventually(|| bob.observed_moves().len() == 1).await;
        assert_eq!(bob.observed_moves(), vec![movement]);

        eventually(|| broker.acknowledged() == 2).await;
        assert!(alice.observed_moves().is_empty());
    }

    #[tokio::test]
    async fn refuse_to_move_while_paused() {
        let broker = broker();
        let connection = broker.connect();
        let alice = Participant::new("alice");
        let _membership = alice.join(&connection).await.unwrap();

        let publisher = open_channel(&connection).await.unwrap();
        publisher
            .publish(EXCHANGE_PERIL_DIRECT, PAUSE_KEY, &PlayingState::paused())
            .await
            .unwrap();
        eventually(|| alice.is_paused()).await;

        let result = alice.move_units(&publisher, infantry(), "asia").await;
        assert!(matches!(result, Err(ParticipantError::Paused)));

        publisher
            .publish(EXCHANGE_PERIL_DIRECT, PAUSE_KEY, &PlayingState::resumed())
            .await
            .unwrap();
        eventually(|| !alice.is_paused()).await;

        alice
            .move_units(&publisher, infantry(), "asia")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refuse_empty_moves() {
        let broker = broker();
        let connection = broker.connect();
        let publisher = open_channel(&connection).await.unwrap();

        let result = Participant::new("carol")
            .move_units(&publisher, Vec::new(), "africa")
            .await;

        assert!(matches!(result, Err(ParticipantError::NoUnits)));
        assert_eq!(broker.published(), 0);
    }

    #[tokio::test]
    async fn release_mailboxes_when_leaving() {
        let broker = broker();
        let connection = broker.connect();
        let membership = Participant::new("dave").join(&connection).await.unwrap();

        assert_eq!(membership.moves().state(), SubscriptionState::Consuming);
        assert_eq!(membership.pause().state(), SubscriptionState::Consuming);
        assert_eq!(broker.open_channels(), 2);

        timeout(PATIENCE, membership.leave()).await.unwrap();
        assert_eq!(broker.open_channels(), 0);
        assert_eq!(broker.queue_flags("pause.dave"), None);
        assert_eq!(broker.queue_flags("army_moves.dave"), None);
    }

    #[tokio::test]
    async fn fail_to_join_without_exchanges() {
        let broker = MemoryBroker::default();
        let connection = broker.connect();

        let result = Participant::new("erin").join(&connection).await;

        assert!(matches!(result, Err(CommunicationError::QueueBind { .. })));
        assert_eq!(broker.open_channels(), 0);
    }
}
