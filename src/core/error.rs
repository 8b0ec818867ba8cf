use thiserror::Error;

use crate::battle::abilities::AbilityId;
use crate::battle::execution::BattlePhase;
use crate::battle::hex::HexPosition;
use crate::core::types::{Faction, UnitId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Faction {0} fields more than one commander")]
    DuplicateCommander(Faction),

    #[error("Invalid force: {0}")]
    InvalidForce(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Position {0} is not on the battle grid")]
    OffGrid(HexPosition),

    #[error("Tile {0} is already occupied")]
    TileOccupied(HexPosition),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;

/// Why a battle command was rejected; a rejected command changes nothing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("The battle is over")]
    BattleOver,

    #[error("Illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition { from: BattlePhase, to: BattlePhase },

    #[error("Command not allowed during {0:?}")]
    WrongPhase(BattlePhase),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Unit {0} is dead")]
    UnitDead(UnitId),

    #[error("Unit {0} is not on the field")]
    NotDeployed(UnitId),

    #[error("Unit {unit} cannot act during {phase:?}")]
    NotYourTurn { unit: UnitId, phase: BattlePhase },

    #[error("Unit {0} is routing and won't take orders")]
    Routing(UnitId),

    #[error("Unit {0} has already moved this phase")]
    AlreadyMoved(UnitId),

    #[error("Unit {0} has already acted this phase")]
    AlreadyActed(UnitId),

    #[error("No path from {from} to {to} within the movement budget")]
    NoPath { from: HexPosition, to: HexPosition },

    #[error("Target at distance {distance} is beyond range {range}")]
    OutOfRange { distance: u32, range: u32 },

    #[error("No line of sight to {0}")]
    NoLineOfSight(HexPosition),

    #[error("Units {0} and {1} are not enemies")]
    NotHostile(UnitId, UnitId),

    #[error("Unknown ability: {0}")]
    UnknownAbility(AbilityId),

    #[error("Unit {unit} does not know {ability}")]
    AbilityNotKnown { unit: UnitId, ability: AbilityId },

    #[error("{ability} is on cooldown for {rounds} more rounds")]
    OnCooldown { ability: AbilityId, rounds: u32 },

    #[error("Needs {needed} action points, has {available}")]
    NotEnoughActionPoints { needed: i32, available: i32 },

    #[error("Position {0} is not on the battle grid")]
    OffGrid(HexPosition),

    #[error("Tile {0} is already occupied")]
    TileOccupied(HexPosition),

    #[error("Position {0} is outside the deployment zone")]
    OutsideDeploymentZone(HexPosition),

    #[error("Deployment zone for {0} has no free tiles left")]
    DeploymentZoneFull(Faction),
}

/// Result of a battle command
pub type CommandResult<T> = std::result::Result<T, CommandError>;
