//! Core type definitions used throughout the codebase

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for units within one battle
///
/// Ids are handed out sequentially at battle construction so that logs and
/// snapshots are reproducible for a given seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Battle round counter (starts at 1 once the battle leaves setup)
pub type Round = u32;

/// Side a unit fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Enemy,
    Neutral,
}

impl Faction {
    /// The side this faction fights against (neutrals oppose nobody)
    pub fn opponent(&self) -> Option<Faction> {
        match self {
            Faction::Player => Some(Faction::Enemy),
            Faction::Enemy => Some(Faction::Player),
            Faction::Neutral => None,
        }
    }

    /// Are these two factions hostile to each other?
    pub fn is_hostile_to(&self, other: Faction) -> bool {
        self.opponent() == Some(other)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Faction::Player => "player",
            Faction::Enemy => "enemy",
            Faction::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_ordering() {
        assert!(UnitId(1) < UnitId(2));
        assert_eq!(UnitId::new(7), UnitId(7));
    }

    #[test]
    fn test_unit_id_display() {
        assert_eq!(UnitId(12).to_string(), "#12");
    }

    #[test]
    fn test_faction_opponents() {
        assert_eq!(Faction::Player.opponent(), Some(Faction::Enemy));
        assert_eq!(Faction::Enemy.opponent(), Some(Faction::Player));
        assert_eq!(Faction::Neutral.opponent(), None);
    }

    #[test]
    fn test_neutral_hostile_to_nobody() {
        assert!(!Faction::Neutral.is_hostile_to(Faction::Player));
        assert!(!Faction::Player.is_hostile_to(Faction::Neutral));
        assert!(Faction::Player.is_hostile_to(Faction::Enemy));
    }
}
