//! In-process broker mirroring the AMQP 0-9-1 routing model
//!
//! The broker lives entirely in memory and is shared by cloning the [`MemoryBroker`] handle.
//! It implements direct and topic exchanges, the default exchange (routing by queue name),
//! durable and transient queues with exclusive ownership, and tears down exclusive queues and
//! all channels when their connection is closed. It is primarily used in tests where it
//! replaces a real broker, but works just as well for running several participants in a
//! single process.
//!
//! Unacknowledged deliveries are not requeued when a consumer goes away.

mod broker;
mod connection;
mod delivery;

pub use broker::*;
pub use connection::*;
pub use delivery::*;

use thiserror::Error;

/// Errors reported by the in-memory broker, modelled after AMQP channel and connection exceptions
#[derive(Debug, Error)]
pub enum MemoryBrokerError {
    /// Connection has been closed
    #[error("connection is closed")]
    ConnectionClosed,
    /// Channel has been closed
    #[error("channel is closed")]
    ChannelClosed,
    /// Exchange does not exist
    #[error("NOT_FOUND - no exchange '{0}'")]
    ExchangeNotFound(String),
    /// Queue does not exist
    #[error("NOT_FOUND - no queue '{0}'")]
    QueueNotFound(String),
    /// Entity exists with different properties
    #[error("PRECONDITION_FAILED - inequivalent arguments for '{0}'")]
    PreconditionFailed(String),
    /// Exclusive queue is owned by another connection
    #[error("RESOURCE_LOCKED - cannot obtain exclusive access to queue '{0}'")]
    ResourceLocked(String),
    /// Delivery has already been acknowledged
    #[error("PRECONDITION_FAILED - unknown delivery tag {0}")]
    UnknownDeliveryTag(u64),
}

/// Matches a routing key against a topic binding pattern
///
/// `*` matches exactly one segment, `#` matches zero or more segments.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();

    segments_match(&pattern, &key)
}

fn segments_match(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skipped| segments_match(rest, &key[skipped..])),
        Some((&"*", rest)) => !key.is_empty() && segments_match(rest, &key[1..]),
        Some((segment, rest)) => key.first() == Some(segment) && segments_match(rest, &key[1..]),
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn match_single_segment_wildcards() {
        assert!(topic_matches("army_moves.*", "army_moves.alice"));
        assert!(!topic_matches("army_moves.*", "army_moves"));
        assert!(!topic_matches("army_moves.*", "army_moves.alice.north"));
        assert!(!topic_matches("army_moves.*", "war.alice"));
    }

    #[test]
    fn match_multi_segment_wildcards() {
        assert!(topic_matches("game_logs.#", "game_logs"));
        assert!(topic_matches("game_logs.#", "game_logs.alice"));
        assert!(topic_matches("game_logs.#", "game_logs.alice.battle"));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("#.alice", "war.alice"));
        assert!(!topic_matches("game_logs.#", "army_moves.alice"));
    }

    #[test]
    fn match_exact_segments() {
        assert!(topic_matches("pause", "pause"));
        assert!(!topic_matches("pause", "pause.alice"));
        assert!(topic_matches("war.*.bob", "war.alice.bob"));
    }
}
