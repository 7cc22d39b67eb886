//! Implementations of traits from this module using third-party crates

pub mod amqp;
pub mod json;
pub mod memory;
