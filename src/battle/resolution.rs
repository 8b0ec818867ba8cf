//! Damage and healing arithmetic
//!
//! The formula itself is deterministic. Morale only decides whether a blow
//! lands and whether it crits, and both rolls come from the battle's own
//! RNG.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::execution::BattleState;
use crate::battle::morale::MoraleModifiers;
use crate::core::config::CombatConfig;
use crate::core::types::UnitId;

/// Outcome of one damage roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub hit: bool,
    pub critical: bool,
    /// Damage dealt (0 on a miss)
    pub amount: i32,
}

/// What applying damage did to the target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DamageReport {
    pub target: Option<UnitId>,
    pub amount: i32,
    pub killed: bool,
    /// Morale consequences of a death, ready for the action's log line
    pub fallout: Vec<String>,
}

/// max(min, base + floor(atk * scale) - floor(def * scale))
pub fn compute_damage(base: i32, attack_stat: i32, defense_stat: i32, config: &CombatConfig) -> i32 {
    let offense = (attack_stat as f64 * config.attack_scale).floor() as i32;
    let mitigation = (defense_stat as f64 * config.defense_scale).floor() as i32;
    (base + offense - mitigation).max(config.min_damage)
}

/// New hp after healing
pub fn compute_heal(hp: i32, max_hp: i32, amount: i32) -> i32 {
    max_hp.min(hp + amount.max(0))
}

/// Roll hit and crit, then compute the damage
///
/// A steady attacker with no crit chance never touches the RNG and always
/// deals exactly `compute_damage`.
#[allow(clippy::too_many_arguments)]
pub fn roll_damage<R: Rng>(
    base: i32,
    attack_stat: i32,
    defense_stat: i32,
    crit_permille: i32,
    modifiers: &MoraleModifiers,
    config: &CombatConfig,
    rng: &mut R,
) -> DamageRoll {
    let hit_chance = modifiers.hit_chance(1.0, config.accuracy_floor);
    if hit_chance < 1.0 && !rng.gen_bool(hit_chance) {
        return DamageRoll {
            hit: false,
            critical: false,
            amount: 0,
        };
    }

    let crit_chance = modifiers.crit_permille(crit_permille);
    let critical = crit_chance > 0 && rng.gen_range(0..1000) < crit_chance;

    let mut amount = compute_damage(base, attack_stat, defense_stat, config);
    if critical {
        amount *= config.crit_multiplier;
    }
    DamageRoll {
        hit: true,
        critical,
        amount,
    }
}

impl BattleState {
    /// Apply damage to a unit, handling death and its morale fallout
    ///
    /// Death is flagged once, the tile is freed, morale reacts before
    /// anything else happens, and victory is re-checked.
    pub fn apply_damage(&mut self, target: UnitId, amount: i32) -> DamageReport {
        let Some(unit) = self.unit_mut(target) else {
            return DamageReport::default();
        };
        let killed = unit.take_damage(amount);
        let position = unit.position;

        let mut report = DamageReport {
            target: Some(target),
            amount,
            killed,
            fallout: Vec::new(),
        };
        if !killed {
            return report;
        }

        if let Some(pos) = position {
            if self.grid.occupant(pos) == Some(target) {
                self.grid.set_occupant(pos, None);
            }
        }
        tracing::debug!("Unit {} died", target);
        report.fallout = self.on_unit_death(target);
        self.check_victory();
        report
    }

    /// Heal a living unit; returns the hp restored
    pub fn apply_heal(&mut self, target: UnitId, amount: i32) -> i32 {
        self.unit_mut(target).map(|u| u.heal(amount)).unwrap_or(0)
    }
}
