//! Independent and project agnostic libraries
//!
//! Everything in here could be extracted into its own crate at any given time. Libraries
//! in this module have been developed with Peril in mind, however, they are in no way bound
//! to the game and everything domain specific lives in the [`domain`](super::domain) module.

pub mod communication;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
