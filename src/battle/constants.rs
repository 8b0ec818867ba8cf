//! Battle system constants - all tunable values in one place
//!
//! These are the defaults behind `BattleConfig`; runtime code reads the
//! config, tests and the config defaults read these.

// Grid
pub const DEFAULT_BATTLE_WIDTH: u32 = 12;
pub const DEFAULT_BATTLE_HEIGHT: u32 = 10;

/// Tiles with elevation strictly above this block line of sight
pub const LOS_ELEVATION_THRESHOLD: i32 = 2;

// Pathfinding
pub const MAX_PATH_ITERATIONS: usize = 4096;

// Morale values (0-100 scale)
pub const MORALE_MIN: i32 = 0;
pub const MORALE_MAX: i32 = 100;
pub const MORALE_DEFAULT: i32 = 70;
pub const MORALE_SMOOTHING_ALPHA: f64 = 0.5;
pub const MORALE_HISTORY_LEN: usize = 3;

// Hysteresis: enter thresholds (moving down, inclusive)
pub const ENTER_SHAKEN: i32 = 65;
pub const ENTER_WAVERING: i32 = 45;
pub const ENTER_ROUTING: i32 = 25;

// Hysteresis: exit thresholds (recovering up, inclusive)
pub const EXIT_SHAKEN: i32 = 72;
pub const EXIT_WAVERING: i32 = 52;
pub const EXIT_ROUTING: i32 = 32;

// Factor bands
pub const LEADERSHIP_MAX: i32 = 15;
pub const TERRAIN_MIN: i32 = -10;
pub const TERRAIN_MAX: i32 = 10;
pub const CASUALTIES_MIN: i32 = -25;
pub const OUTNUMBERED_MIN: i32 = -20;
pub const EFFECTS_MIN: i32 = -25;
pub const EFFECTS_MAX: i32 = 25;

// Leadership
pub const LEADERSHIP_FALLOFF_PER_HEX: i32 = 3;

// Terrain
pub const FLANKED_ENEMY_COUNT: usize = 3;
pub const FLANKED_PENALTY: i32 = -5;

// Casualties
pub const HEAVY_WOUND_FRACTION: f64 = 0.5;
pub const LIGHT_WOUND_FRACTION: f64 = 0.8;
pub const HEAVY_WOUND_PENALTY: i32 = -6; // -0.3 scaled x20
pub const LIGHT_WOUND_PENALTY: i32 = -2; // -0.1 scaled x20
pub const DEAD_ALLY_RADIUS: u32 = 2;
pub const DEAD_ALLY_PENALTY: i32 = -4;
pub const DEAD_ALLY_MAX_COUNTED: usize = 3;
pub const DEAD_ALLY_PENALTY_CAP: i32 = -10;

// Outnumbered
pub const LOCAL_FORCE_RADIUS: u32 = 2;
pub const FORMATION_BONUS_PER_ALLY: i32 = 3;
pub const FORMATION_MAX_ALLIES: usize = 3;

// Commander events
pub const COMMANDER_DEATH_SHIFT: i32 = -15;
pub const AURA_REFRESH_INTERVAL: u32 = 2;
pub const AURA_STATUS_DURATION: u32 = 2;

// Status stacking
pub const MAX_STATUS_STACKS: u8 = 3;

// Surrender
pub const SURRENDER_ROUTING_FRACTION: f64 = 0.75;

// Flee / zone of control
pub const ZOC_ROLL_SIDES: i32 = 10;

// Combat
pub const ATTACK_SCALE: f64 = 0.25;
pub const DEFENSE_SCALE: f64 = 0.2;
pub const MIN_DAMAGE: i32 = 1;
pub const CRIT_MULTIPLIER: i32 = 2;
pub const ACCURACY_FLOOR: f64 = 0.10;
pub const MIN_ACTION_POINTS: i32 = 1;
pub const MIN_INITIATIVE: i32 = 1;
pub const COMMANDER_ACTION_POINTS: i32 = 3;
pub const BASIC_ATTACK_AP: i32 = 1;

// Spoils
pub const GOLD_PER_LEVEL: i64 = 5;
pub const GEAR_WEAR_DIVISOR: u32 = 10;

// Headless runs
pub const DEFAULT_MAX_ROUNDS: u32 = 50;
