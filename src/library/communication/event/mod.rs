//! Structures to realise typed publish and subscribe on top of a message broker
//!
//! Publishers have no knowledge of who is listening. They hand a value to a [`Publisher`]
//! together with an [exchange](ExchangeDescriptor) and an exact routing key and the broker
//! takes care of forwarding it to every queue with a matching binding. Whether anybody
//! receives it depends solely on the bindings present at that time.
//!
//! Subscribers describe the queue they want with a [`QueueBinding`]. Its
//! [`QueueDurability`] class decides how long the queue lives: `Durable` queues are shared
//! and survive restarts, `Transient` queues are private mailboxes that vanish together with
//! the connection that declared them. A call to [`subscribe`] declares and binds the queue,
//! opens a delivery stream and hands every decoded message to a [`Consumer`] on a
//! dedicated task, returning a [`Subscription`] handle which owns that task.
//!
//! Deliveries are processed strictly in order within one subscription and acknowledged after
//! the consumer returned. Deliveries which fail to decode are acknowledged as well and never
//! reach the consumer. Subscriptions are independent of each other as each one owns a separate
//! broker channel, so a slow consumer only ever delays its own queue.

mod broker;
mod consumer;
mod delivery;
mod exchange;
mod publisher;
mod queue;
mod subscription;
mod topology;

pub mod routing;

pub use broker::*;
pub use consumer::*;
pub use delivery::*;
pub use exchange::*;
pub use publisher::*;
pub use queue::*;
pub use subscription::*;
pub use topology::*;
