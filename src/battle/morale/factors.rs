//! Battlefield conditions that feed morale
//!
//! Every function here is a read-only view over units and the grid. Missing
//! commander units are skipped rather than reported.

use crate::battle::battle_map::BattleGrid;
use crate::battle::constants::*;
use crate::battle::hex::HexPosition;
use crate::battle::morale::block::MoraleFactors;
use crate::battle::units::{Commander, Unit};
use crate::core::types::UnitId;

/// Read-only battlefield view used for morale queries
#[derive(Clone, Copy)]
pub struct MoraleContext<'a> {
    pub units: &'a [Unit],
    pub grid: &'a BattleGrid,
    pub commanders: &'a [Commander],
}

impl<'a> MoraleContext<'a> {
    pub fn new(units: &'a [Unit], grid: &'a BattleGrid, commanders: &'a [Commander]) -> Self {
        Self {
            units,
            grid,
            commanders,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&'a Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Living units standing within `radius` of `center`
    pub fn living_within(
        &self,
        center: HexPosition,
        radius: u32,
    ) -> impl Iterator<Item = (&'a Unit, HexPosition)> + 'a {
        self.units.iter().filter_map(move |u| {
            let pos = u.position?;
            (u.is_alive() && pos.distance(&center) <= radius).then_some((u, pos))
        })
    }

    /// Living hostile units adjacent to a position
    pub fn adjacent_enemies(&self, unit: &Unit, at: HexPosition) -> Vec<&'a Unit> {
        self.living_within(at, 1)
            .filter(|(other, pos)| *pos != at && unit.faction.is_hostile_to(other.faction))
            .map(|(other, _)| other)
            .collect()
    }

    /// Distance to the closest living enemy, if any
    pub fn nearest_enemy_distance(&self, unit: &Unit, from: HexPosition) -> Option<u32> {
        self.units
            .iter()
            .filter(|u| u.is_alive() && unit.faction.is_hostile_to(u.faction))
            .filter_map(|u| u.position.map(|p| p.distance(&from)))
            .min()
    }
}

/// Compute all five factors for a positioned unit
///
/// Units off the field only get their effects factor.
pub fn compute_factors(unit: &Unit, ctx: &MoraleContext) -> MoraleFactors {
    let effects = effects_factor(unit);
    let Some(pos) = unit.position else {
        return MoraleFactors {
            effects,
            ..MoraleFactors::default()
        };
    };

    MoraleFactors {
        leadership: leadership_factor(unit, pos, ctx),
        terrain: terrain_factor(unit, pos, ctx),
        casualties: casualties_factor(unit, pos, ctx),
        outnumbered: outnumbered_factor(unit, pos, ctx),
        effects,
    }
    .clamped()
}

/// Nearest in-range friendly commander: falloff plus half its magic, capped
pub fn leadership_factor(unit: &Unit, pos: HexPosition, ctx: &MoraleContext) -> i32 {
    let nearest = ctx
        .commanders
        .iter()
        .filter(|c| c.faction == unit.faction && c.unit_id != unit.id)
        .filter_map(|c| {
            let leader = ctx.unit(c.unit_id)?;
            let leader_pos = leader.position.filter(|_| leader.is_alive())?;
            let distance = leader_pos.distance(&pos);
            (distance <= c.aura.radius).then_some((distance, c.unit_id, c, leader))
        })
        .min_by_key(|(distance, id, _, _)| (*distance, *id));

    let Some((distance, _, commander, leader)) = nearest else {
        return 0;
    };

    let falloff = (commander.aura.power - LEADERSHIP_FALLOFF_PER_HEX * distance as i32).max(0);
    (falloff + leader.stats.magic / 2).min(LEADERSHIP_MAX)
}

/// Tile bonus, minus the flanking penalty on open ground
pub fn terrain_factor(unit: &Unit, pos: HexPosition, ctx: &MoraleContext) -> i32 {
    let Some(tile) = ctx.grid.tile(pos) else {
        return 0;
    };

    let mut factor = tile.terrain.morale_bonus();
    if !tile.terrain.is_defensive() && is_flanked(unit, pos, ctx) {
        factor += FLANKED_PENALTY;
    }
    factor.clamp(TERRAIN_MIN, TERRAIN_MAX)
}

/// Three or more living enemies on adjacent hexes
pub fn is_flanked(unit: &Unit, pos: HexPosition, ctx: &MoraleContext) -> bool {
    ctx.adjacent_enemies(unit, pos).len() >= FLANKED_ENEMY_COUNT
}

/// Own wounds plus nearby fallen allies
pub fn casualties_factor(unit: &Unit, pos: HexPosition, ctx: &MoraleContext) -> i32 {
    let fraction = unit.hp_fraction();
    let wounds = if fraction < HEAVY_WOUND_FRACTION {
        HEAVY_WOUND_PENALTY
    } else if fraction < LIGHT_WOUND_FRACTION {
        LIGHT_WOUND_PENALTY
    } else {
        0
    };

    let fallen = ctx
        .units
        .iter()
        .filter(|u| u.dead && u.id != unit.id && u.faction == unit.faction)
        .filter(|u| {
            u.position
                .is_some_and(|p| p.distance(&pos) <= DEAD_ALLY_RADIUS)
        })
        .count()
        .min(DEAD_ALLY_MAX_COUNTED);
    let fallen_penalty = (DEAD_ALLY_PENALTY * fallen as i32).max(DEAD_ALLY_PENALTY_CAP);

    (wounds + fallen_penalty).clamp(CASUALTIES_MIN, 0)
}

/// Local enemy:ally ratio penalty, offset by adjacent allies
pub fn outnumbered_factor(unit: &Unit, pos: HexPosition, ctx: &MoraleContext) -> i32 {
    let mut enemies = 0usize;
    let mut allies = 0usize;
    let mut adjacent_allies = 0usize;

    for (other, other_pos) in ctx.living_within(pos, LOCAL_FORCE_RADIUS) {
        if unit.faction.is_hostile_to(other.faction) {
            enemies += 1;
        } else if other.faction == unit.faction {
            // Includes the unit itself
            allies += 1;
            if other.id != unit.id && other_pos.is_adjacent(&pos) {
                adjacent_allies += 1;
            }
        }
    }

    let ratio = enemies as f64 / allies.max(1) as f64;
    let penalty = if ratio > 1.0 {
        -((ratio - 1.0).min(1.0) * (-OUTNUMBERED_MIN) as f64).round() as i32
    } else {
        0
    };

    let formation = FORMATION_BONUS_PER_ALLY * adjacent_allies.min(FORMATION_MAX_ALLIES) as i32;
    penalty.max(OUTNUMBERED_MIN) + formation
}

/// Signed sum of morale statuses
pub fn effects_factor(unit: &Unit) -> i32 {
    unit.status_morale().clamp(EFFECTS_MIN, EFFECTS_MAX)
}
