//! Battle configuration with documented constants
//!
//! Every tunable used at runtime is collected here. Defaults come from
//! `battle::constants`; a TOML file can override any subset of them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::constants::*;
use crate::core::error::Result;

/// Morale dynamics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoraleConfig {
    /// Value a morale block starts at when first evaluated
    pub default_value: i32,

    /// Weight of the new raw value in the exponential smoothing step
    ///
    /// At 0.5 a single bad round moves the smoothed value by at most half
    /// of the raw delta.
    pub smoothing_alpha: f64,

    /// Downward thresholds (inclusive): ema at or below enters the state
    pub enter_shaken: i32,
    pub enter_wavering: i32,
    pub enter_routing: i32,

    /// Upward thresholds (inclusive): ema at or above leaves the state
    pub exit_shaken: i32,
    pub exit_wavering: i32,
    pub exit_routing: i32,

    /// Army-wide shift applied when a commander dies
    pub commander_death_shift: i32,

    /// Rounds between commander aura refreshes
    pub aura_refresh_interval: u32,

    /// Fraction of living non-commander units routing at which a side gives up
    pub surrender_fraction: f64,

    /// Sides of the die added to speed in zone-of-control contests
    pub zoc_roll_sides: i32,
}

impl Default for MoraleConfig {
    fn default() -> Self {
        Self {
            default_value: MORALE_DEFAULT,
            smoothing_alpha: MORALE_SMOOTHING_ALPHA,
            enter_shaken: ENTER_SHAKEN,
            enter_wavering: ENTER_WAVERING,
            enter_routing: ENTER_ROUTING,
            exit_shaken: EXIT_SHAKEN,
            exit_wavering: EXIT_WAVERING,
            exit_routing: EXIT_ROUTING,
            commander_death_shift: COMMANDER_DEATH_SHIFT,
            aura_refresh_interval: AURA_REFRESH_INTERVAL,
            surrender_fraction: SURRENDER_ROUTING_FRACTION,
            zoc_roll_sides: ZOC_ROLL_SIDES,
        }
    }
}

/// Damage arithmetic and action economy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Fraction of the offensive stat added to the base amount (floored)
    pub attack_scale: f64,
    /// Fraction of the defensive stat subtracted (floored)
    pub defense_scale: f64,
    /// Every successful hit deals at least this much
    pub min_damage: i32,
    pub crit_multiplier: i32,
    /// Morale can never push hit chance below this
    pub accuracy_floor: f64,
    /// Action points a commander starts each of its phases with
    pub commander_action_points: i32,
    /// Action point cost of a commander's basic attack
    pub basic_attack_ap: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_scale: ATTACK_SCALE,
            defense_scale: DEFENSE_SCALE,
            min_damage: MIN_DAMAGE,
            crit_multiplier: CRIT_MULTIPLIER,
            accuracy_floor: ACCURACY_FLOOR,
            commander_action_points: COMMANDER_ACTION_POINTS,
            basic_attack_ap: BASIC_ATTACK_AP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Hard cap on A* expansions; exceeding it reports "no path"
    pub max_iterations: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_PATH_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Intermediate tiles above this elevation block line of sight
    pub los_elevation_threshold: i32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            los_elevation_threshold: LOS_ELEVATION_THRESHOLD,
        }
    }
}

/// Complete battle configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub morale: MoraleConfig,
    pub combat: CombatConfig,
    pub pathfinding: PathfindingConfig,
    pub rules: RulesConfig,
}

impl BattleConfig {
    /// Parse a config from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(content)?;
        Ok(config)
    }
}

/// Load a battle config from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<BattleConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    BattleConfig::from_toml_str(&contents)
}
