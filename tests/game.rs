use peril::domain::event::{ArmyMove, PlayingState, Unit, UnitRank};
use peril::domain::routing::{
    army_moves_binding, army_moves_key, exchanges, pause_binding, EXCHANGE_PERIL_DIRECT,
    EXCHANGE_PERIL_TOPIC, PAUSE_KEY,
};
use peril::library::communication::event::{
    declare_and_bind, open_channel, subscribe, FnConsumer, Publisher, QueueDurability,
};
use peril::library::communication::implementation::memory::MemoryBroker;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
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
async fn moves_reach_every_wildcard_subscriber() {
    let broker = broker();
    let connection = broker.connect();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let _subscription = subscribe(
        &connection,
        army_moves_binding("bob"),
        FnConsumer::new(move |movement: ArmyMove| sink.lock().unwrap().push(movement)),
    )
    .await
    .unwrap();

    let movement = ArmyMove {
        participant: "alice".into(),
        units: vec![Unit {
            id: 7,
            rank: UnitRank::Cavalry,
        }],
        destination: "americas".into(),
    };

    let publisher = open_channel(&connection).await.unwrap();
    publisher
        .publish(EXCHANGE_PERIL_TOPIC, &army_moves_key("alice"), &movement)
        .await
        .unwrap();

    eventually(|| received.lock().unwrap().len() == 1).await;
    assert_eq!(*received.lock().unwrap(), vec![movement]);
    eventually(|| broker.acknowledged() == 1).await;
}

#[tokio::test]
async fn pause_fans_out_one_copy_per_mailbox() {
    let broker = broker();
    let participants = ["alice", "bob", "carol"];
    let connections: Vec<_> = participants.iter().map(|_| broker.connect()).collect();
    let received = Arc::new(Mutex::new(Vec::new()));

    let mut subscriptions = Vec::new();
    for (participant, connection) in participants.iter().zip(&connections) {
        let sink = received.clone();
        let name = participant.to_string();
        let handler = FnConsumer::new(move |state: PlayingState| {
            sink.lock().unwrap().push((name.clone(), state))
        });

        subscriptions.push(
            subscribe(connection, pause_binding(participant), handler)
                .await
                .unwrap(),
        );
    }

    let publisher = open_channel(&connections[0]).await.unwrap();
    publisher
        .publish(EXCHANGE_PERIL_DIRECT, PAUSE_KEY, &PlayingState::paused())
        .await
        .unwrap();

    eventually(|| received.lock().unwrap().len() == participants.len()).await;

    let mut recipients: Vec<String> = received
        .lock()
        .unwrap()
        .iter()
        .map(|(name, state)| {
            assert!(state.paused);
            name.clone()
        })
        .collect();
    recipients.sort();
    assert_eq!(recipients, vec!["alice", "bob", "carol"]);
    eventually(|| broker.acknowledged() == participants.len()).await;
    assert_eq!(broker.duplicate_acknowledgements(), 0);
}

#[tokio::test]
async fn transient_mailboxes_vanish_with_their_connection() {
    let broker = broker();
    let connection = broker.connect();

    let (_channel, queue) = declare_and_bind(&connection, &pause_binding("dave"))
        .await
        .unwrap();
    assert_eq!(queue.name(), "pause.dave");
    assert_eq!(
        broker.queue_flags("pause.dave"),
        Some(QueueDurability::Transient.flags())
    );

    drop(connection);

    assert_eq!(broker.queue_flags("pause.dave"), None);
    assert_eq!(broker.open_channels(), 0);
}

#[tokio::test]
async fn mailboxes_are_private_to_their_connection() {
    let broker = broker();
    let owner = broker.connect();
    let intruder = broker.connect();

    let _subscription = subscribe(
        &owner,
        pause_binding("erin"),
        FnConsumer::new(|_: PlayingState| {}),
    )
    .await
    .unwrap();

    let result = subscribe(
        &intruder,
        pause_binding("erin"),
        FnConsumer::new(|_: PlayingState| {}),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(broker.open_channels(), 1);
}
