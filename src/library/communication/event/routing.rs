//! Helpers to build routing keys and binding patterns
//!
//! Routing keys are dot-separated segments. Publishers always use exact keys, patterns
//! with wildcards are only valid in bindings on topic exchanges where `*` matches exactly
//! one segment and `#` matches zero or more. Matching itself is done by the broker.
//!
//! Addressing a single participant is done by appending its identifier to a well-known
//! prefix. Subscribers either bind to their own key to only receive what is addressed
//! to them or to the prefix followed by a wildcard to receive the events of everyone.

/// Matches exactly one segment in a topic binding
pub const SINGLE_SEGMENT_WILDCARD: &str = "*";

/// Matches zero or more segments in a topic binding
pub const MULTI_SEGMENT_WILDCARD: &str = "#";

/// Separator between routing key segments
pub const SEGMENT_SEPARATOR: char = '.';

/// Key addressing a single participant, `<prefix>.<participant>`
pub fn addressed(prefix: &str, participant: &str) -> String {
    format!("{}{}{}", prefix, SEGMENT_SEPARATOR, participant)
}

/// Pattern matching the keys of all participants under a prefix, `<prefix>.*`
pub fn any_segment(prefix: &str) -> String {
    addressed(prefix, SINGLE_SEGMENT_WILDCARD)
}

/// Pattern matching every key below a prefix regardless of depth, `<prefix>.#`
pub fn any_suffix(prefix: &str) -> String {
    addressed(prefix, MULTI_SEGMENT_WILDCARD)
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn address_participants_by_suffix() {
        assert_eq!(addressed("army_moves", "alice"), "army_moves.alice");
    }

    #[test]
    fn build_wildcard_patterns() {
        assert_eq!(any_segment("army_moves"), "army_moves.*");
        assert_eq!(any_suffix("game_logs"), "game_logs.#");
    }
}
