//! Battle system - turn-based tactics on a hex grid
//!
//! A battle is a single owned `BattleState`: the grid, both forces, the
//! phase machine and one seeded RNG. Commands go in, a snapshot and the
//! narrative log come out, and a `BattleResult` is available once a side
//! has won.
//!
//! Morale is not decoration here:
//! - Every unit carries a smoothed morale value with a hysteretic state
//! - The state scales accuracy, action points, initiative and crits
//! - Routing units stop taking orders and try to flee
//! - A line that breaks surrenders

pub mod abilities;
pub mod ai;
pub mod battle_map;
pub mod constants;
pub mod deployment;
pub mod execution;
pub mod hex;
pub mod morale;
pub mod outcome;
pub mod pathfinding;
pub mod resolution;
pub mod targeting;
pub mod templates;
pub mod terrain;
pub mod units;

// Re-exports for convenient access
pub use abilities::{Ability, AbilityCatalog, AbilityCategory, AbilityEffect, AbilityId, AbilityShape};
pub use ai::{auto_battle, BattleAi, GreedyAi};
pub use battle_map::{BattleGrid, HexTile};
pub use constants::*;
pub use deployment::{DeploymentZones, Force, ForceUnit};
pub use execution::{BattlePhase, BattleSnapshot, BattleState, LogEntry, LogKind, UnitSnapshot};
pub use hex::{HexDirection, HexPosition};
pub use morale::{MoraleBlock, MoraleFactors, MoraleModifiers, MoraleState};
pub use outcome::{merge_loot, BattleResult, Casualty, GearWear};
pub use pathfinding::{find_path, path_cost, reachable, Path, PathLimits};
pub use resolution::{compute_damage, compute_heal, DamageReport, DamageRoll};
pub use targeting::AbilityOutcome;
pub use templates::{AreaTemplate, ConeWidth, HexSet};
pub use terrain::Terrain;
pub use units::{
    AuraDefinition, Commander, EffectSource, LootStack, StatBonus, StatusEffect, StatusKind, Unit,
    UnitStats, UnitTag,
};
