//! Trait implementations using [`lapin`](::lapin)
//!
//! Deliveries are consumed with manual acknowledgement and published without the
//! `mandatory` or `immediate` flags, so messages that match no binding are silently dropped
//! by the broker.

const REPLY_SUCCESS: u16 = 200;
const REPLY_TEXT: &str = "OK";

mod channel;
mod connection;
mod delivery;

pub use channel::*;
pub use connection::*;
pub use delivery::*;
