//! Structures to communicate between processes through a message broker
//!
//! Communication follows a publish and subscribe model. Messages are published to an
//! [exchange](event::ExchangeDescriptor) under an exact routing key. The broker forwards
//! them to every queue bound to that exchange with a matching key. Direct exchanges
//! compare keys for equality while topic exchanges match dot-separated patterns where
//! `*` stands for exactly one segment and `#` for zero or more.
//!
//! On the receiving side, a [`Subscription`](event::Subscription) declares and binds its
//! own queue, opens a delivery stream on a dedicated channel and processes deliveries
//! one at a time on a background task. Every delivery is acknowledged exactly once, even
//! when its payload could not be parsed, so that a malformed message can not stall or crash
//! the subscription.
//!
//! The [`event`] module contains the backend-agnostic traits and the delivery logic,
//! while [`implementation`] provides the wire format and the concrete brokers.

mod error;

pub mod event;
pub mod implementation;

pub use error::CommunicationError;
