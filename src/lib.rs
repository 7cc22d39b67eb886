//! This library crate contains everything needed to coordinate a game of Peril over a message broker.
//!
//! Submodules have been introduced to split responsibilities. They form a chain of dependencies
//! from the low-level, game-agnostic [`library`], over the Peril [`domain`] specific payloads and
//! routing conventions, up to the high-level [`modules`](module) which run participants and the authority.

#![deny(missing_docs)]

pub mod domain;
pub mod library;
pub mod module;
