//! Exchanges, routing keys and queue bindings used by Peril
//!
//! | Traffic     | Exchange       | Published with        | Queue                       | Bound with       | Durability |
//! |-------------|----------------|-----------------------|-----------------------------|------------------|------------|
//! | Army moves  | `peril_topic`  | `army_moves.<player>` | `army_moves.<participant>`  | `army_moves.*`   | Transient  |
//! | Pause       | `peril_direct` | `pause`               | `pause.<participant>`       | `pause`          | Transient  |
//! | Game logs   | `peril_topic`  | `game_logs`           | `game_logs`                 | `game_logs`      | Durable    |

use crate::library::communication::event::routing::{addressed, any_segment};
use crate::library::communication::event::{
    ExchangeDescriptor, ExchangeKind, QueueBinding, QueueDurability,
};

/// Prefix of routing keys carrying army moves
pub const ARMY_MOVES_PREFIX: &str = "army_moves";

/// Prefix of routing keys carrying war recognitions
pub const WAR_RECOGNITIONS_PREFIX: &str = "war";

/// Routing key of pause and resume broadcasts
pub const PAUSE_KEY: &str = "pause";

/// Routing key and queue name of game logs
pub const GAME_LOG_SLUG: &str = "game_logs";

/// Name of the direct exchange
pub const EXCHANGE_PERIL_DIRECT: &str = "peril_direct";

/// Name of the topic exchange
pub const EXCHANGE_PERIL_TOPIC: &str = "peril_topic";

/// Exchange carrying control broadcasts
pub fn direct_exchange() -> ExchangeDescriptor {
    ExchangeDescriptor::new(EXCHANGE_PERIL_DIRECT, ExchangeKind::Direct)
}

/// Exchange carrying player traffic and logs
pub fn topic_exchange() -> ExchangeDescriptor {
    ExchangeDescriptor::new(EXCHANGE_PERIL_TOPIC, ExchangeKind::Topic)
}

/// All exchanges the game relies on
pub fn exchanges() -> [ExchangeDescriptor; 2] {
    [direct_exchange(), topic_exchange()]
}

/// Routing key under which a participant publishes its moves
pub fn army_moves_key(participant: &str) -> String {
    addressed(ARMY_MOVES_PREFIX, participant)
}

/// Routing key under which a participant publishes the wars it recognized
pub fn war_recognitions_key(participant: &str) -> String {
    addressed(WAR_RECOGNITIONS_PREFIX, participant)
}

/// Private mailbox of a participant receiving the moves of all participants
pub fn army_moves_binding(participant: &str) -> QueueBinding {
    QueueBinding::new(
        EXCHANGE_PERIL_TOPIC,
        addressed(ARMY_MOVES_PREFIX, participant),
        any_segment(ARMY_MOVES_PREFIX),
        QueueDurability::Transient,
    )
}

/// Private mailbox of a participant receiving pause and resume broadcasts
pub fn pause_binding(participant: &str) -> QueueBinding {
    QueueBinding::new(
        EXCHANGE_PERIL_DIRECT,
        addressed(PAUSE_KEY, participant),
        PAUSE_KEY,
        QueueDurability::Transient,
    )
}

/// Shared queue aggregating the game logs of all participants
pub fn game_log_binding() -> QueueBinding {
    QueueBinding::new(
        EXCHANGE_PERIL_TOPIC,
        GAME_LOG_SLUG,
        GAME_LOG_SLUG,
        QueueDurability::Durable,
    )
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn address_moves_by_participant() {
        assert_eq!(army_moves_key("alice"), "army_moves.alice");
    }

    #[test]
    fn address_war_recognitions_by_participant() {
        assert_eq!(war_recognitions_key("alice"), "war.alice");
    }

    #[test]
    fn give_each_participant_a_private_move_mailbox() {
        let binding = army_moves_binding("bob");

        assert_eq!(binding.exchange(), "peril_topic");
        assert_eq!(binding.queue(), "army_moves.bob");
        assert_eq!(binding.routing_key(), "army_moves.*");
        assert_eq!(binding.durability(), QueueDurability::Transient);
    }

    #[test]
    fn bind_pause_mailboxes_to_the_exact_key() {
        let binding = pause_binding("bob");

        assert_eq!(binding.exchange(), "peril_direct");
        assert_eq!(binding.queue(), "pause.bob");
        assert_eq!(binding.routing_key(), "pause");
        assert_eq!(binding.durability(), QueueDurability::Transient);
    }

    #[test]
    fn share_a_durable_game_log_queue() {
        let binding = game_log_binding();

        assert_eq!(binding.exchange(), "peril_topic");
        assert_eq!(binding.queue(), "game_logs");
        assert_eq!(binding.routing_key(), "game_logs");
        assert_eq!(binding.durability(), QueueDurability::Durable);
    }

    #[test]
    fn declare_one_exchange_per_kind() {
        let [direct, topic] = exchanges();

        assert_eq!(direct.kind(), ExchangeKind::Direct);
        assert_eq!(topic.kind(), ExchangeKind::Topic);
    }
}
