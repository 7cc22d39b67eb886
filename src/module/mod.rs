//! Collaborators running a game on top of a broker connection

pub mod options;

pub mod authority;
pub mod participant;
