//! Payloads exchanged between participants and the authority

mod army_move;
mod game_log;
mod playing_state;

pub use army_move::{ArmyMove, Unit, UnitRank, UnknownUnitRank};
pub use game_log::GameLog;
pub use playing_state::PlayingState;
