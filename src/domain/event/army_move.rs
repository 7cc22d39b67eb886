use crate::domain::routing::army_moves_key;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of a unit, determining its strength in battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitRank {
    #[allow(missing_docs)]
    Infantry,
    #[allow(missing_docs)]
    Cavalry,
    #[allow(missing_docs)]
    Artillery,
}

impl UnitRank {
    /// Relative strength of the rank
    pub fn power(&self) -> u32 {
        match self {
            Self::Infantry => 1,
            Self::Cavalry => 5,
            Self::Artillery => 10,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Infantry => "infantry",
            Self::Cavalry => "cavalry",
            Self::Artillery => "artillery",
        }
    }
}

impl fmt::Display for UnitRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank name that does not correspond to any [`UnitRank`]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown unit rank '{0}', expected infantry, cavalry or artillery")]
pub struct UnknownUnitRank(String);

impl FromStr for UnitRank {
    type Err = UnknownUnitRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "infantry" => Ok(Self::Infantry),
            "cavalry" => Ok(Self::Cavalry),
            "artillery" => Ok(Self::Artillery),
            _ => Err(UnknownUnitRank(s.to_owned())),
        }
    }
}

/// Single unit owned by a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier unique among the units of the owning participant
    pub id: u32,
    /// Kind of unit
    pub rank: UnitRank,
}

/// Participant moved a set of units to a new location
///
/// Every participant publishes its moves under its own routing key and receives the moves
/// of all participants, including its own, through a private mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyMove {
    /// Name of the participant who moved
    pub participant: String,
    /// Units that have been moved
    pub units: Vec<Unit>,
    /// Location the units moved to
    pub destination: String,
}

impl ArmyMove {
    /// Routing key the move is published with
    pub fn routing_key(&self) -> String {
        army_moves_key(&self.participant)
    }

    /// Combined strength of all moved units
    pub fn power(&self) -> u32 {
        self.units.iter().map(|unit| unit.rank.power()).sum()
    }
}
