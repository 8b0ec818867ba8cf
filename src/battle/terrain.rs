//! Battle terrain types and their effects
//!
//! Terrain sets movement cost, default cover, and the morale bonus or
//! penalty of standing on it.

use serde::{Deserialize, Serialize};

/// Primary terrain type for a battle hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Plains,
    Road,
    Forest,
    Hills,
    Mountain,
    Water,
    Swamp,
    Rubble,
}

impl Terrain {
    /// Movement points needed to enter a tile of this terrain
    pub fn movement_cost(&self) -> u32 {
        match self {
            Terrain::Plains => 1,
            Terrain::Road => 1,
            Terrain::Forest => 2,
            Terrain::Hills => 2,
            Terrain::Mountain => 3,
            Terrain::Water => 3,
            Terrain::Swamp => 2,
            Terrain::Rubble => 2,
        }
    }

    /// Morale contribution of standing on this terrain
    pub fn morale_bonus(&self) -> i32 {
        match self {
            Terrain::Forest => 5,
            Terrain::Mountain => 10,
            Terrain::Water => -5,
            Terrain::Swamp => -3,
            _ => 0,
        }
    }

    /// Does this terrain protect a unit from being flanked?
    pub fn is_defensive(&self) -> bool {
        matches!(self, Terrain::Forest | Terrain::Hills | Terrain::Mountain)
    }

    /// Default cover value for a tile of this terrain (0 = none)
    pub fn cover_value(&self) -> i32 {
        match self {
            Terrain::Forest => 2,
            Terrain::Hills => 1,
            Terrain::Mountain => 3,
            Terrain::Rubble => 1,
            _ => 0,
        }
    }

    /// Display name used in the battle log
    pub fn label(&self) -> &'static str {
        match self {
            Terrain::Plains => "plains",
            Terrain::Road => "road",
            Terrain::Forest => "forest",
            Terrain::Hills => "hills",
            Terrain::Mountain => "mountain",
            Terrain::Water => "water",
            Terrain::Swamp => "swamp",
            Terrain::Rubble => "rubble",
        }
    }
}
